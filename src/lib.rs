//! Logging to [Google Cloud Logging](https://cloud.google.com/logging) from
//! [Cloud Functions](https://cloud.google.com/functions).
//!
//! Entries are written to the log Cloud Functions write to themselves and are attributed to the
//! function through the `cloud_function` monitored resource, using the environment variables the
//! runtime sets (see [`Config::from_env`]).
//!
//! A payload is sent as a JSON payload when it is, or serializes to, a JSON object, and as a text
//! payload otherwise. See [`classify`].
//!
//! # Usage
//!
//! There are two ways to log:
//!
//! 1. The functions [`debug`], [`info`], [`warn`], [`error`], [`critical`] and friends log through
//!    a process-wide client that is created on first use. They are best-effort: failures are
//!    written to a diagnostic logger on stderr and never returned.
//! 2. A [`Client`] that you create, and close, yourself. Every failure is returned to you.
//!
//! ```no_run
//! use cflog::{Client, Context, Severity};
//!
//! # async fn run() -> Result<(), cflog::Error> {
//! let ctx = Context::background();
//! cflog::info(&ctx, "fire and forget").await;
//!
//! let client = Client::from_env(&ctx).await?;
//! client.log(&ctx, Severity::Notice, r#"{"message": "checked"}"#).await?;
//! client.close().await
//! # }
//! ```

mod client;
pub mod config;
mod context;
mod error;
mod global;
pub mod logging;
mod payload;
mod severity;
pub mod transport;

pub use client::Client;
pub use config::Config;
pub use context::Context;
pub use error::{Error, TransportError};
pub use global::{
    alert, critical, debug, emergency, error, info, install, log, notice, warn, Connecting,
    LazyClient, OnFailure,
};
pub use payload::{classify, classify_input, Input, Json, Loggable, Payload};
pub use severity::Severity;
pub use transport::{RecordingTransport, Transport};
