use tracing::debug;

use crate::{
    bot::context::MessageContext,
    domain::{BotId, ConversationId},
    messaging::{
        port::MessagingPort,
        types::{ConversationInfo, MessageEvent},
    },
    Result,
};

/// What the platform told us about a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationKind {
    /// Public multi-party channel.
    Channel,
    PrivateGroup,
    /// Direct message (or anything that is neither of the above).
    Direct,
    /// The lookup failed.
    Unclassified,
}

impl ConversationKind {
    pub fn classify(lookup: &Result<ConversationInfo>) -> Self {
        match lookup {
            Ok(info) if info.is_channel => ConversationKind::Channel,
            Ok(info) if info.is_private => ConversationKind::PrivateGroup,
            Ok(_) => ConversationKind::Direct,
            Err(_) => ConversationKind::Unclassified,
        }
    }

    /// Multi-party conversations require the bot to be addressed explicitly.
    pub fn requires_mention(self) -> bool {
        matches!(self, ConversationKind::Channel | ConversationKind::PrivateGroup)
    }
}

/// Outcome of the channel (name-based) rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelRule {
    /// Not addressed to us; drop without side effects.
    Ignore,
    Proceed { authorized: bool },
}

/// Decides whether an inbound message is for us and whether it came from the
/// authorized conversation.
pub struct AuthorizationFilter<'a> {
    authorized_channel: &'a str,
    bot_id: &'a BotId,
}

impl<'a> AuthorizationFilter<'a> {
    pub fn new(authorized_channel: &'a str, bot_id: &'a BotId) -> Self {
        Self {
            authorized_channel,
            bot_id,
        }
    }

    /// Build the message context, or `None` when the message must be ignored.
    pub async fn evaluate(
        &self,
        port: &dyn MessagingPort,
        event: &MessageEvent,
    ) -> Option<MessageContext> {
        let lookup = port.conversation_info(&event.channel).await;
        if let Err(e) = &lookup {
            debug!(channel = %event.channel, error = %e, "conversation lookup failed; treating as unclassified");
        }
        let kind = ConversationKind::classify(&lookup);
        let name = lookup.as_ref().ok().map(|info| info.name.as_str());

        let by_name = match self.channel_rule(kind, name, &event.text) {
            ChannelRule::Ignore => {
                debug!(
                    channel = %event.channel,
                    "ignoring message as it doesn't contain {:?} prefix",
                    self.bot_id.mention_prefix()
                );
                return None;
            }
            ChannelRule::Proceed { authorized } => authorized,
        };
        let by_id = self.id_rule(&event.channel);

        Some(MessageContext::new(event, by_name || by_id))
    }

    /// Channel/private-group messages must start with the mention prefix; when
    /// they do, the conversation's name decides authorization.
    pub fn channel_rule(&self, kind: ConversationKind, name: Option<&str>, text: &str) -> ChannelRule {
        if !kind.requires_mention() {
            return ChannelRule::Proceed { authorized: false };
        }
        if !text.starts_with(&self.bot_id.mention_prefix()) {
            return ChannelRule::Ignore;
        }
        ChannelRule::Proceed {
            authorized: name == Some(self.authorized_channel),
        }
    }

    /// The configured value may be a conversation id rather than a name.
    pub fn id_rule(&self, channel: &ConversationId) -> bool {
        channel.as_str() == self.authorized_channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::testing::{message, FakePort};
    use crate::errors::Error;

    fn bot() -> BotId {
        BotId("U123".to_string())
    }

    #[test]
    fn classify_prefers_channel_then_private() {
        let both = Ok(ConversationInfo {
            is_channel: true,
            is_private: true,
            name: "ops".into(),
        });
        assert_eq!(ConversationKind::classify(&both), ConversationKind::Channel);

        let group = Ok(ConversationInfo {
            is_channel: false,
            is_private: true,
            name: "secret".into(),
        });
        assert_eq!(ConversationKind::classify(&group), ConversationKind::PrivateGroup);

        let im = Ok(ConversationInfo::default());
        assert_eq!(ConversationKind::classify(&im), ConversationKind::Direct);

        let failed = Err(Error::External("channel_not_found".into()));
        assert_eq!(ConversationKind::classify(&failed), ConversationKind::Unclassified);
    }

    #[test]
    fn channel_rule_requires_prefix_in_multi_party_conversations() {
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        assert_eq!(
            f.channel_rule(ConversationKind::Channel, Some("ops"), "get pods"),
            ChannelRule::Ignore
        );
        assert_eq!(
            f.channel_rule(ConversationKind::PrivateGroup, Some("ops"), "hey <@U123> get pods"),
            ChannelRule::Ignore
        );
        assert_eq!(
            f.channel_rule(ConversationKind::Channel, Some("ops"), "<@U123> get pods"),
            ChannelRule::Proceed { authorized: true }
        );
        assert_eq!(
            f.channel_rule(ConversationKind::Channel, Some("random"), "<@U123> get pods"),
            ChannelRule::Proceed { authorized: false }
        );
    }

    #[test]
    fn channel_rule_passes_direct_and_unclassified_without_granting() {
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        for kind in [ConversationKind::Direct, ConversationKind::Unclassified] {
            assert_eq!(
                f.channel_rule(kind, Some("ops"), "get pods"),
                ChannelRule::Proceed { authorized: false }
            );
        }
    }

    #[test]
    fn id_rule_matches_exact_conversation_id() {
        let id = bot();
        let f = AuthorizationFilter::new("C42", &id);
        assert!(f.id_rule(&ConversationId("C42".into())));
        assert!(!f.id_rule(&ConversationId("C420".into())));
    }

    #[tokio::test]
    async fn unprefixed_channel_message_is_dropped() {
        let port = FakePort::new().with_channel("C1", "ops", false);
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        assert!(f.evaluate(&port, &message("C1", "get pods", None)).await.is_none());
    }

    #[tokio::test]
    async fn prefixed_message_in_named_channel_is_authorized() {
        let port = FakePort::new().with_channel("C1", "ops", false);
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        let ctx = f
            .evaluate(&port, &message("C1", "<@U123> get pods", None))
            .await
            .unwrap();
        assert!(ctx.authorized());
        assert_eq!(ctx.text(), "<@U123> get pods");
    }

    #[tokio::test]
    async fn prefixed_message_in_other_channel_proceeds_unauthorized() {
        let port = FakePort::new().with_channel("C2", "random", true);
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        let ctx = f
            .evaluate(&port, &message("C2", "<@U123> get pods", None))
            .await
            .unwrap();
        assert!(!ctx.authorized());
    }

    #[tokio::test]
    async fn configured_id_authorizes_regardless_of_classification() {
        let id = bot();
        let f = AuthorizationFilter::new("C9", &id);

        // Named channel whose name does not match, but the id does.
        let port = FakePort::new().with_channel("C9", "something-else", false);
        let ctx = f
            .evaluate(&port, &message("C9", "<@U123> get pods", None))
            .await
            .unwrap();
        assert!(ctx.authorized());

        // Lookup failure.
        let port = FakePort::new();
        let ctx = f
            .evaluate(&port, &message("C9", "get pods", None))
            .await
            .unwrap();
        assert!(ctx.authorized());

        // Direct message.
        let port = FakePort::new().with_direct("C9");
        let ctx = f
            .evaluate(&port, &message("C9", "get pods", None))
            .await
            .unwrap();
        assert!(ctx.authorized());
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_unclassified() {
        let port = FakePort::new();
        let id = bot();
        let f = AuthorizationFilter::new("ops", &id);
        let ctx = f
            .evaluate(&port, &message("D1", "get pods", None))
            .await
            .unwrap();
        assert!(!ctx.authorized());
        assert_eq!(port.lookups(), vec!["D1".to_string()]);
    }
}
