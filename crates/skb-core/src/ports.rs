use async_trait::async_trait;

use crate::domain::Platform;

/// Runs a chat request and produces the text to send back.
///
/// The core does not interpret `request`; permission decisions for
/// unauthorized conversations belong to the implementation. The call is
/// total: failures are reported as text, and an empty string means "nothing
/// to say".
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, platform: Platform, authorized: bool, request: &str) -> String;
}
