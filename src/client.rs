use chrono::Utc;
use google_logging2::api::{LogEntry, MonitoredResource, WriteLogEntriesRequest};
use slog::{debug, o};

use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::payload::{classify, Loggable, Payload};
use crate::severity::Severity;
use crate::transport::{self, Transport};

/// Writes log entries on behalf of a Cloud Function.
///
/// The log name and the monitored resource are derived once, at construction. Every call to
/// [`log`](Client::log) submits exactly one entry in one request; nothing is buffered or retried.
/// Errors are always returned to the caller. Close the client with [`close`](Client::close) when
/// you are done with it.
///
/// ```no_run
/// use cflog::{Client, Context, Severity};
///
/// # async fn run() -> Result<(), cflog::Error> {
/// let client = Client::from_env(&Context::background()).await?;
/// client.log(&Context::background(), Severity::Debug, "Debug message").await?;
/// client.close().await
/// # }
/// ```
pub struct Client {
    transport: Box<dyn Transport>,
    log_name: String,
    resource: MonitoredResource,
    log: slog::Logger,
}

impl Client {
    /// Creates a client that ships entries to the Google Logging API.
    ///
    /// # Errors
    ///
    /// Will return [`Error::Configuration`] if the transport can not be established, e.g. when no
    /// access token can be obtained, or [`Error::Cancelled`]/[`Error::DeadlineExceeded`] when `ctx`
    /// ends first.
    pub async fn connect(ctx: &Context, config: Config) -> Result<Self, Error> {
        Self::connect_with_logger(ctx, config, slog::Logger::root(slog::Discard, o!())).await
    }

    /// Like [`connect`](Client::connect), sending the client's own debug output to `log`.
    pub async fn connect_with_logger(
        ctx: &Context,
        config: Config,
        log: slog::Logger,
    ) -> Result<Self, Error> {
        let writer = ctx
            .run(transport::connect(&config, &log))
            .await?
            .map_err(|e| Error::Configuration(Box::new(e)))?;
        debug!(log, "Logging client created";
            "project" => &config.project_id, "function" => &config.function_name);
        Ok(Self::with_transport(&config, writer).with_logger(log))
    }

    /// Creates a client with the configuration found in the environment, see [`Config::from_env`].
    pub async fn from_env(ctx: &Context) -> Result<Self, Error> {
        Self::connect(ctx, Config::from_env()).await
    }

    /// Creates a client that submits its entries through `transport`.
    pub fn with_transport<T: Transport + 'static>(config: &Config, transport: T) -> Self {
        Client {
            transport: Box::new(transport),
            log_name: config.log_name(),
            resource: config.resource(),
            log: slog::Logger::root(slog::Discard, o!()),
        }
    }

    #[must_use]
    pub fn with_logger(self, log: slog::Logger) -> Self {
        Self {
            log: log.new(o!("log_name" => self.log_name.clone())),
            ..self
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    pub fn resource(&self) -> &MonitoredResource {
        &self.resource
    }

    /// Builds the [LogEntry](https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry)
    /// that [`log`](Client::log) would submit.
    ///
    /// # Errors
    ///
    /// Will return [`Error::Serialization`] if the payload can not be serialized.
    pub fn entry<L: Loggable + ?Sized>(
        &self,
        severity: Severity,
        payload: &L,
    ) -> Result<LogEntry, Error> {
        let mut entry = LogEntry {
            log_name: Some(self.log_name.clone()),
            resource: Some(self.resource.clone()),
            severity: Some(severity.to_string()),
            timestamp: Some(Utc::now()),
            ..Default::default()
        };
        match classify(payload)? {
            Payload::Text(text) => entry.text_payload = Some(text),
            Payload::Structured(document) => {
                entry.json_payload = Some(document.into_iter().collect())
            }
        }
        Ok(entry)
    }

    /// Submits one entry with the given severity and payload.
    ///
    /// The payload is sent as a JSON payload when it is, or serializes to, a JSON object and as a
    /// text payload otherwise. See [`classify`](crate::classify).
    ///
    /// # Errors
    ///
    /// Will return [`Error::Serialization`] if the payload can not be serialized,
    /// [`Error::Submission`] if the transport fails to deliver the entry and
    /// [`Error::Cancelled`]/[`Error::DeadlineExceeded`] when `ctx` ends first.
    pub async fn log<L: Loggable + ?Sized>(
        &self,
        ctx: &Context,
        severity: Severity,
        payload: &L,
    ) -> Result<(), Error> {
        let entry = self.entry(severity, payload)?;
        let structured = entry.json_payload.is_some();
        let request = WriteLogEntriesRequest {
            entries: Some(vec![entry]),
            ..Default::default()
        };
        ctx.run(self.transport.write_entries(request))
            .await?
            .map_err(Error::Submission)?;
        debug!(self.log, "Log entry submitted";
            "severity" => %severity, "structured" => structured);
        Ok(())
    }

    /// Releases the transport.
    ///
    /// # Errors
    ///
    /// Will return [`Error::Close`] if the transport fails to close.
    pub async fn close(self) -> Result<(), Error> {
        self.transport.close().await.map_err(Error::Close)?;
        debug!(self.log, "Logging client closed");
        Ok(())
    }
}
