use chrono::{DateTime, TimeDelta, Utc};

use reqwest::Client;

use slog::debug;

use crate::error::Error;
use crate::writer::get_error_response;

/// The metadata server hostname used when none is configured.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

// Tokens are renewed this many seconds before they expire.
const RENEW_MARGIN_SECS: u64 = 60;

/// Where the bearer token for the Logging API comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenSource {
    /// Ask the metadata server of the environment we run in (workload identity).
    MetadataServer {
        host: String,
        /// The service account to request a token for, `default` when `None`.
        service_account: Option<String>,
    },
    /// Use this token as is. It is never renewed.
    Static(String),
}

impl Default for TokenSource {
    fn default() -> Self {
        TokenSource::MetadataServer {
            host: DEFAULT_METADATA_HOST.to_string(),
            service_account: None,
        }
    }
}

impl TokenSource {
    fn token_url(host: &str, service_account: Option<&str>) -> String {
        format!(
            "http://{}/computeMetadata/v1/instance/service-accounts/{}/token",
            host,
            service_account.unwrap_or("default")
        )
    }
}

/// Token caching
#[derive(Default)]
pub(crate) struct Token {
    token: Option<String>,
    renew_after: DateTime<Utc>,
}

// Example:
// ```
// {
//   "access_token": "ya29.c.Ks0Cywchw6EJei_7ifQZKV....oRZy70M2ahRMfHY1qzUxGfxQcQ1cQ",
//   "expires_in": 3166,
//   "token_type": "Bearer"
// }
// ```
fn parse_token_body(body: &str) -> Result<(String, u64), Error> {
    let token_data: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::SerializeError {
            context: "deserializing token data".to_string(),
            source: e,
        })?;
    let token = token_data["access_token"]
        .as_str()
        .ok_or(Error::TokenNotFound)?
        .to_string();
    let expires_in = token_data["expires_in"]
        .as_u64()
        .ok_or(Error::TokenExpiryNotFound)?;
    Ok((token, expires_in))
}

impl Token {
    fn renew_after_from_expires_in(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
        let renew_after = TimeDelta::seconds(expires_in.saturating_sub(RENEW_MARGIN_SECS) as i64);
        now + renew_after
    }

    fn cached(&self, now: DateTime<Utc>) -> Option<&str> {
        match &self.token {
            Some(token) if now < self.renew_after => Some(token.as_str()),
            _ => None,
        }
    }

    pub(crate) async fn fetch_access_token(
        &mut self,
        client: &Client,
        source: &TokenSource,
        log: &slog::Logger,
    ) -> Result<String, Error> {
        let (host, service_account) = match source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::MetadataServer {
                host,
                service_account,
            } => (host, service_account.as_deref()),
        };

        if let Some(token) = self.cached(Utc::now()) {
            return Ok(token.to_string());
        }

        let url = TokenSource::token_url(host, service_account);
        debug!(log, "Requesting access token"; "url" => &url);

        let response = client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::ReqwestError {
                context: "performing HTTP GET token credentials from metadata server".to_string(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(get_error_response(response, "fetching token".to_string()).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ReqwestError {
                context: "consuming response body of access token request".to_string(),
                source: e,
            })?;
        let (token, expires_in) = parse_token_body(&body)?;
        self.token = Some(token.clone());
        self.renew_after = Self::renew_after_from_expires_in(Utc::now(), expires_in);
        debug!(log, "Access token renewed"; "expires_in" => expires_in);
        Ok(token)
    }
}
