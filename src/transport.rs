//! The seam between the [`Client`](crate::Client) and whatever delivers its entries.
//!
//! The [`googlelog::EntryWriter`] ships them to the Google Logging API. The
//! [`RecordingTransport`] keeps them in memory, which is what you want in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use google_logging2::api::WriteLogEntriesRequest;
use googlelog::EntryWriter;
use slog::o;

use crate::config::Config;
use crate::error::TransportError;

/// Delivers log entries to the logging backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers one request. Implementations must not retry or buffer.
    async fn write_entries(&self, request: WriteLogEntriesRequest) -> Result<(), TransportError>;

    /// Releases the resources held by the transport.
    async fn close(&self) -> Result<(), TransportError>;
}

#[async_trait]
impl Transport for EntryWriter {
    async fn write_entries(&self, request: WriteLogEntriesRequest) -> Result<(), TransportError> {
        Ok(self.write(request).await?)
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(EntryWriter::close(self)?)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn write_entries(&self, request: WriteLogEntriesRequest) -> Result<(), TransportError> {
        (**self).write_entries(request).await
    }

    async fn close(&self) -> Result<(), TransportError> {
        (**self).close().await
    }
}

// Builds the Google transport, fetching a token once to make sure credentials are available.
pub(crate) async fn connect(
    config: &Config,
    log: &slog::Logger,
) -> Result<EntryWriter, googlelog::Error> {
    googlelog::Builder::new()
        .with_endpoint(&config.endpoint)
        .with_token_source(config.token_source.clone())
        .with_logger(log.new(o!("component" => "transport")))
        .connect()
        .await
}

/// A [`Transport`] that keeps every request it receives in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<WriteLogEntriesRequest>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
    closed: AtomicBool,
}

#[derive(thiserror::Error, Debug)]
#[error("{0}")]
struct Rejected(String);

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes `delay` to accept each request.
    #[must_use]
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    /// Makes subsequent writes fail with `message`, or succeed again when `None`.
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message.map(String::from);
    }

    /// The requests accepted so far.
    pub fn requests(&self) -> Vec<WriteLogEntriesRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn write_entries(&self, request: WriteLogEntriesRequest) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_closed() {
            return Err(Box::new(Rejected("transport is closed".to_string())));
        }
        if let Some(message) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(Box::new(Rejected(message)));
        }
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Box::new(Rejected("transport already closed".to_string())));
        }
        Ok(())
    }
}
