use thiserror::Error;

/// The error produced by a [`Transport`](crate::Transport) implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Defines the errors returned by the [`Client`](crate::Client) and the
/// [`LazyClient`](crate::LazyClient).
#[derive(Error, Debug)]
pub enum Error {
    /// The transport could not be established, e.g. no credentials could be obtained.
    #[error("could not create the logging transport: {0}")]
    Configuration(#[source] TransportError),

    /// The payload could not be converted to JSON.
    #[error("could not serialize the payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The transport rejected the entry or could not deliver it.
    #[error("could not submit the log entry: {0}")]
    Submission(#[source] TransportError),

    /// The call was cancelled through its [`Context`](crate::Context) before it completed.
    #[error("the log call was cancelled")]
    Cancelled,

    /// The deadline of the call's [`Context`](crate::Context) passed before it completed.
    #[error("the deadline of the log call was exceeded")]
    DeadlineExceeded,

    #[error("could not close the logging transport: {0}")]
    Close(#[source] TransportError),
}

impl Error {
    /// Whether this error means the entry was not delivered by `log`. Serialization, cancellation
    /// and deadline failures count as submission failures.
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            Error::Submission(_)
                | Error::Serialization(_)
                | Error::Cancelled
                | Error::DeadlineExceeded
        )
    }
}
