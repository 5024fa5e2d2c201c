//! Writes log entries to [Google Cloud Logging](https://cloud.google.com/logging) using the
//! [`entries:write`](https://cloud.google.com/logging/docs/reference/v2/rest/v2/entries/write) REST method.
//!
//! # Usage
//!
//! By default the access token is obtained from the metadata server, which is available in
//! Cloud Functions, Cloud Run and on GKE with [workload identity](https://cloud.google.com/iam/docs/workload-identity-federation).
//! A static token can be configured instead with [`TokenSource::Static`].
//!
//! ```no_run
//! use google_logging2::api::{LogEntry, WriteLogEntriesRequest};
//! use googlelog::Builder;
//!
//! # async fn run() -> Result<(), googlelog::Error> {
//! let writer = Builder::new().connect().await?;
//! writer
//!     .write(WriteLogEntriesRequest {
//!         entries: Some(vec![LogEntry {
//!             log_name: Some("projects/my-project/logs/my-log".to_string()),
//!             text_payload: Some("hello".to_string()),
//!             ..Default::default()
//!         }]),
//!         ..Default::default()
//!     })
//!     .await?;
//! writer.close()
//! # }
//! ```

/// Googlelog Error types
pub mod error;

mod token;

/// The [`EntryWriter`] and its [`Builder`]
pub mod writer;

pub use error::Error;
pub use token::{TokenSource, DEFAULT_METADATA_HOST};
pub use writer::{Builder, EntryWriter, DEFAULT_ENDPOINT};
