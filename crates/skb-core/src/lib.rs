//! Core of the Slack command bridge.
//!
//! This crate is framework-agnostic. The Slack transport and the command
//! executor live behind ports (traits) implemented in adapter crates.

pub mod bot;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;

pub use errors::{Error, Result};
