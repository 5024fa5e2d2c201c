use std::sync::atomic::{AtomicBool, Ordering};

use google_logging2::api::WriteLogEntriesRequest;

use reqwest::{Client, Response};

use slog::{debug, o};

use tokio::sync::Mutex;

use crate::error::Error;
use crate::token::{Token, TokenSource};

/// The Google Logging API base URL used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com";

const USER_AGENT: &str = concat!("googlelog/", env!("CARGO_PKG_VERSION"));

pub(crate) async fn get_error_response(response: Response, context: String) -> Error {
    let status = response.status();

    let body = match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<String>(&bytes) {
            Ok(json) => json,
            Err(_) => String::from_utf8_lossy(&bytes).to_string(),
        },
        Err(e) => format!("could not decode body of HTTP Error response: {e}"),
    };

    Error::HttpResponseError {
        context,
        status,
        body,
    }
}

/// Builder for the [`EntryWriter`]
#[derive(Default)]
pub struct Builder {
    endpoint: Option<String>,
    token_source: TokenSource,
    logger: Option<slog::Logger>,
}

impl Builder {
    /// Creates a builder that targets the public Google Logging API and obtains its tokens from
    /// the metadata server.
    #[must_use = "The builder must be used"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL of the Logging API, for instance to point at a local fake.
    #[must_use = "The builder must be used"]
    pub fn with_endpoint(self, endpoint: &str) -> Self {
        Self {
            endpoint: Some(endpoint.trim_end_matches('/').to_string()),
            ..self
        }
    }

    #[must_use = "The builder must be used"]
    pub fn with_token_source(self, token_source: TokenSource) -> Self {
        Self {
            token_source,
            ..self
        }
    }

    /// Sets the logger that receives the writer's own debug output.
    #[must_use = "The builder must be used"]
    pub fn with_logger(self, logger: slog::Logger) -> Self {
        Self {
            logger: Some(logger),
            ..self
        }
    }

    /// Builds the writer without contacting any remote service.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client can not be initialized.
    pub fn build(self) -> Result<EntryWriter, Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ReqwestError {
                context: "building the HTTP client".to_string(),
                source: e,
            })?;
        let endpoint = self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let log = self
            .logger
            .unwrap_or_else(|| slog::Logger::root(slog::Discard, o!()))
            .new(o!("endpoint" => endpoint.clone()));
        Ok(EntryWriter {
            client,
            endpoint,
            token_source: self.token_source,
            token: Mutex::new(Token::default()),
            closed: AtomicBool::new(false),
            log,
        })
    }

    /// Builds the writer and verifies that credentials can be obtained by fetching an access
    /// token once. The token is cached for subsequent writes.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the HTTP client can not be initialized or no token can be obtained.
    pub async fn connect(self) -> Result<EntryWriter, Error> {
        let writer = self.build()?;
        writer.access_token().await?;
        Ok(writer)
    }
}

/// Sends [`WriteLogEntriesRequest`]s to the Google Logging API, one HTTP request per call.
///
/// The writer can be shared between tasks; the cached access token is guarded by a mutex.
pub struct EntryWriter {
    client: Client,
    endpoint: String,
    token_source: TokenSource,
    token: Mutex<Token>,
    closed: AtomicBool,
    log: slog::Logger,
}

impl EntryWriter {
    fn entries_url(&self) -> String {
        format!("{}/v2/entries:write", self.endpoint)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    /// Returns a valid access token, renewing it when it is about to expire.
    pub async fn access_token(&self) -> Result<String, Error> {
        self.ensure_open()?;
        let mut token = self.token.lock().await;
        token
            .fetch_access_token(&self.client, &self.token_source, &self.log)
            .await
    }

    /// Writes the given request with the `entries:write` method.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the writer is closed, no token could be obtained, the request could
    /// not be sent or the API responded with an unsuccessful status.
    pub async fn write(&self, body: WriteLogEntriesRequest) -> Result<(), Error> {
        let token = self.access_token().await?;
        let entries = body.entries.as_ref().map_or(0, Vec::len);

        let response = self
            .client
            .post(self.entries_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ReqwestError {
                context: "performing HTTP POST request to the Google Logging API".to_string(),
                source: e,
            })?;
        let status = response.status();
        if status.is_success() {
            debug!(self.log, "Log entries written"; "entries" => entries);
            Ok(())
        } else {
            Err(get_error_response(
                response,
                "response when sending log entry to Google Logging API".to_string(),
            )
            .await)
        }
    }

    /// Closes the writer. Subsequent writes fail with [`Error::Closed`].
    ///
    /// # Errors
    ///
    /// Will return [`Error::Closed`] if the writer was closed before.
    pub fn close(&self) -> Result<(), Error> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed);
        }
        debug!(self.log, "Entry writer closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
