use std::fmt;

/// Slack user id of the bot itself (e.g. `U0123ABCD`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BotId(pub String);

/// Slack user id of a message author.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

/// Slack conversation id (channel, private group or IM).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConversationId(pub String);

/// Timestamp of a thread's root message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreadTs(pub String);

impl BotId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The addressing token Slack renders for an `@bot` mention.
    pub fn mention_prefix(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ThreadTs {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<BotId> for UserId {
    fn eq(&self, other: &BotId) -> bool {
        self.0 == other.0
    }
}

/// Chat platform a request originated from, handed to the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Slack,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Slack => "slack",
        }
    }
}
