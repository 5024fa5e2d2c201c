//! Configuration derived from the environment a Cloud Function runs in.
//!
//! See <https://cloud.google.com/functions/docs/configuring/env-var#runtime_environment_variables_set_automatically>.
//! Older runtimes set `GCP_PROJECT` and `FUNCTION_NAME`, newer ones only `GOOGLE_CLOUD_PROJECT`
//! (when configured) and `K_SERVICE`. Values are used verbatim and absent values end up empty.

use std::collections::HashMap;
use std::env;

use google_logging2::api::MonitoredResource;
use googlelog::{TokenSource, DEFAULT_ENDPOINT, DEFAULT_METADATA_HOST};

/// The monitored resource type of Cloud Functions.
pub const RESOURCE_TYPE: &str = "cloud_function";

/// Defines an environment variable read by this crate, with fallbacks in order of preference.
pub struct EnvVar {
    names: &'static [&'static str],
    default: &'static str,
}

impl EnvVar {
    const fn new(names: &'static [&'static str], default: &'static str) -> Self {
        EnvVar { names, default }
    }

    pub fn name(&self) -> &'static str {
        self.names[0]
    }

    /// Returns the value of the first variable that is set, or the default.
    pub fn val_from<F>(&self, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.names
            .iter()
            .find_map(|&name| lookup(name))
            .unwrap_or_else(|| self.default.to_string())
    }
}

pub const PROJECT: EnvVar = EnvVar::new(&["GCP_PROJECT", "GOOGLE_CLOUD_PROJECT"], "");
pub const FUNCTION_NAME: EnvVar = EnvVar::new(&["FUNCTION_NAME", "K_SERVICE"], "");
pub const FUNCTION_REGION: EnvVar = EnvVar::new(&["FUNCTION_REGION"], "");
pub const LOGGING_ENDPOINT: EnvVar = EnvVar::new(&["CFLOG_LOGGING_ENDPOINT"], DEFAULT_ENDPOINT);
pub const ACCESS_TOKEN: EnvVar = EnvVar::new(&["CFLOG_ACCESS_TOKEN"], "");
pub const METADATA_HOST: EnvVar = EnvVar::new(&["GCE_METADATA_HOST"], DEFAULT_METADATA_HOST);
/// Minimum level of the diagnostic side-channel.
pub const LOG_LEVEL: EnvVar = EnvVar::new(&["CFLOG_LOG_LEVEL"], "info");

/// Identity of the function emitting logs, plus the options of the transport shipping them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub project_id: String,
    pub function_name: String,
    pub region: String,
    /// Base URL of the Google Logging API.
    pub endpoint: String,
    pub token_source: TokenSource,
}

impl Config {
    pub fn new<Str>(project_id: Str, function_name: Str, region: Str) -> Self
    where
        Str: Into<String>,
    {
        Config {
            project_id: project_id.into(),
            function_name: function_name.into(),
            region: region.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token_source: TokenSource::default(),
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_source = match ACCESS_TOKEN.val_from(&lookup) {
            token if !token.is_empty() => TokenSource::Static(token),
            _ => TokenSource::MetadataServer {
                host: METADATA_HOST.val_from(&lookup),
                service_account: None,
            },
        };
        Config {
            project_id: PROJECT.val_from(&lookup),
            function_name: FUNCTION_NAME.val_from(&lookup),
            region: FUNCTION_REGION.val_from(&lookup),
            endpoint: LOGGING_ENDPOINT.val_from(&lookup),
            token_source,
        }
    }

    #[must_use]
    pub fn with_endpoint<Str: Into<String>>(self, endpoint: Str) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_token_source(self, token_source: TokenSource) -> Self {
        Self {
            token_source,
            ..self
        }
    }

    /// The `logName` Cloud Functions write to, e.g.
    /// `projects/my-project/logs/cloudfunctions.googleapis.com%2Fcloud-functions`.
    pub fn log_name(&self) -> String {
        format!(
            "projects/{}/logs/cloudfunctions.googleapis.com%2Fcloud-functions",
            self.project_id
        )
    }

    /// The [MonitoredResource](https://cloud.google.com/logging/docs/reference/v2/rest/v2/MonitoredResource)
    /// that identifies this function.
    pub fn resource(&self) -> MonitoredResource {
        MonitoredResource {
            type_: Some(RESOURCE_TYPE.to_string()),
            labels: Some(HashMap::from([
                ("function_name".to_string(), self.function_name.clone()),
                ("project_id".to_string(), self.project_id.clone()),
                ("region".to_string(), self.region.clone()),
            ])),
        }
    }
}
