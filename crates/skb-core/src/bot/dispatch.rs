use tracing::debug;

use crate::{
    bot::context::MessageContext,
    domain::{BotId, Platform},
    ports::Executor,
};

/// Remove one leading `<@BOT_ID>` token.
///
/// Text without the prefix is returned unchanged; the remainder is not
/// trimmed.
pub fn strip_mention<'t>(text: &'t str, bot_id: &BotId) -> &'t str {
    text.strip_prefix(bot_id.mention_prefix().as_str())
        .unwrap_or(text)
}

/// Turns a message into a request and asks the executor for a result.
pub struct CommandDispatcher<'a> {
    executor: &'a dyn Executor,
    bot_id: &'a BotId,
    platform: Platform,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(executor: &'a dyn Executor, bot_id: &'a BotId) -> Self {
        Self {
            executor,
            bot_id,
            platform: Platform::Slack,
        }
    }

    /// Run the request once and record request and response on `ctx`.
    ///
    /// No retry and no timeout: whatever the executor returns is what gets
    /// sent, including an empty string.
    pub async fn dispatch(&self, ctx: &mut MessageContext) {
        let request = strip_mention(ctx.text(), self.bot_id).to_string();
        debug!(
            channel = %ctx.channel(),
            authorized = ctx.authorized(),
            request = %request,
            "dispatching request"
        );
        let response = self
            .executor
            .execute(self.platform, ctx.authorized(), &request)
            .await;
        ctx.record_exchange(request, response);
    }
}
