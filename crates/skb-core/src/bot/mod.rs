//! Inbound message pipeline and the supervisor that drives it.
//!
//! Per message: [`filter::AuthorizationFilter`] decides addressing and stamps
//! a [`context::MessageContext`], [`dispatch::CommandDispatcher`] runs the
//! request through the executor, [`sender::ResponseSender`] delivers the
//! result. [`supervisor::SlackBot`] owns the connection and feeds events
//! through the pipeline one at a time.

pub mod context;
pub mod dispatch;
pub mod filter;
pub mod sender;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod testing;

pub use supervisor::SlackBot;
