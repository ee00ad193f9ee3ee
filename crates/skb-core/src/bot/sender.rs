use tracing::debug;

use crate::{
    bot::context::MessageContext,
    errors::Error,
    formatting::format_code_block,
    messaging::{
        port::MessagingPort,
        types::{FileUpload, PostOptions},
    },
    Result,
};

/// Responses this long (in characters) or longer go out as a file.
pub const FILE_UPLOAD_THRESHOLD: usize = 3990;

/// How a response will be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Inline,
    Upload,
}

impl Delivery {
    /// `None` for an empty response: there is nothing to deliver.
    pub fn for_response(response: &str) -> Option<Self> {
        if response.is_empty() {
            return None;
        }
        if response.chars().count() >= FILE_UPLOAD_THRESHOLD {
            Some(Delivery::Upload)
        } else {
            Some(Delivery::Inline)
        }
    }
}

/// Delivers a dispatched response back to the conversation it came from.
pub struct ResponseSender<'a> {
    port: &'a dyn MessagingPort,
}

impl<'a> ResponseSender<'a> {
    pub fn new(port: &'a dyn MessagingPort) -> Self {
        Self { port }
    }

    pub async fn send(&self, ctx: &MessageContext) -> Result<()> {
        debug!("Slack incoming Request: {}", ctx.request());
        debug!("Slack Response: {}", ctx.response());

        let Some(delivery) = Delivery::for_response(ctx.response()) else {
            return Err(Error::EmptyResponse {
                request: ctx.request().to_string(),
            });
        };

        match delivery {
            Delivery::Upload => {
                let file = FileUpload {
                    filename: ctx.request().to_string(),
                    title: ctx.request().to_string(),
                    content: ctx.response().to_string(),
                };
                self.port
                    .upload_file(ctx.channel(), file)
                    .await
                    .map_err(|e| e.context("while uploading file"))
            }
            Delivery::Inline => {
                let opts = PostOptions {
                    as_user: true,
                    thread_ts: ctx.thread_ts().cloned(),
                };
                self.port
                    .post_message(ctx.channel(), &format_code_block(ctx.response()), opts)
                    .await
                    .map_err(|e| e.context("while posting Slack message"))
            }
        }
    }
}
