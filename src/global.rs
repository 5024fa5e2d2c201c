//! Best-effort logging through a lazily created, process-wide [`Client`].
//!
//! The functions in this module never return errors. The first call creates the shared client
//! from the environment, using a background [`Context`] rather than the caller's. The caller's
//! context only bounds how long the call waits for it: when it is cancelled or its deadline passes
//! first, the attempt is abandoned. If construction fails, or an entry can not be submitted, the
//! failure is written to the diagnostic side-channel (see [`logging`](crate::logging)) and the
//! entry is dropped. An abandoned or failed construction is retried on the next call. The shared
//! client is never closed.
//!
//! Use a [`Client`] directly, or [`LazyClient::try_log`], when you need to know whether an entry
//! made it.
//!
//! ```no_run
//! use cflog::{Context, Json};
//! use serde::Serialize;
//!
//! #[derive(Debug, Serialize)]
//! struct S {
//!     message: String,
//! }
//!
//! # async fn run() {
//! let ctx = Context::background();
//! cflog::debug(&ctx, "string").await;
//! cflog::warn(&ctx, r#"{"message": "json string"}"#).await;
//! cflog::error(&ctx, &Json(S { message: "json struct".to_string() })).await;
//! # }
//! ```

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;

use slog::error;
use tokio::sync::OnceCell;

use crate::client::Client;
use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::logging;
use crate::payload::Loggable;
use crate::severity::Severity;

/// The future returned by a [`LazyClient`]'s connector.
pub type Connecting = Pin<Box<dyn Future<Output = Result<Client, Error>> + Send>>;

type Connector = Box<dyn Fn() -> Connecting + Send + Sync>;

/// What a [`LazyClient`] does with failures it does not return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OnFailure {
    /// Write them to the diagnostic logger.
    #[default]
    Log,
    /// Drop them.
    Silent,
}

/// A [`Client`] that is created on first use.
///
/// Construction happens at most once at a time: concurrent first callers wait for the same
/// attempt. Only a successful attempt is kept.
pub struct LazyClient {
    client: OnceCell<Client>,
    connector: Connector,
    on_failure: OnFailure,
    diagnostics: slog::Logger,
}

impl LazyClient {
    /// Creates a `LazyClient` that calls `connector` to create its client.
    pub fn new<F, Fut>(connector: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Client, Error>> + Send + 'static,
    {
        Self::with_connector(
            Box::new(move || -> Connecting { Box::pin(connector()) }),
            logging::diagnostic_logger_from_env(),
        )
    }

    /// Creates a `LazyClient` that connects with the configuration found in the environment.
    /// The client's own debug output goes to the diagnostic logger as well.
    pub fn from_env() -> Self {
        let diagnostics = logging::diagnostic_logger_from_env();
        let log = diagnostics.clone();
        Self::with_connector(
            Box::new(move || -> Connecting {
                let log = log.clone();
                Box::pin(async move {
                    Client::connect_with_logger(&Context::background(), Config::from_env(), log)
                        .await
                })
            }),
            diagnostics,
        )
    }

    fn with_connector(connector: Connector, diagnostics: slog::Logger) -> Self {
        LazyClient {
            client: OnceCell::new(),
            connector,
            on_failure: OnFailure::default(),
            diagnostics,
        }
    }

    #[must_use]
    pub fn with_on_failure(self, on_failure: OnFailure) -> Self {
        Self { on_failure, ..self }
    }

    /// Sets the logger failures are reported to.
    #[must_use]
    pub fn with_diagnostics(self, diagnostics: slog::Logger) -> Self {
        Self {
            diagnostics,
            ..self
        }
    }

    /// Whether the client has been created.
    pub fn is_ready(&self) -> bool {
        self.client.initialized()
    }

    /// Returns the client, creating it if this is the first successful call.
    ///
    /// # Errors
    ///
    /// Will return the error of the connector if the client could not be created.
    pub async fn client(&self) -> Result<&Client, Error> {
        self.client.get_or_try_init(|| (self.connector)()).await
    }

    /// Logs through the client and returns any failure. Waiting for the client to be created is
    /// bound by `ctx`, like the submission itself.
    pub async fn try_log<L: Loggable + ?Sized>(
        &self,
        ctx: &Context,
        severity: Severity,
        payload: &L,
    ) -> Result<(), Error> {
        ctx.run(self.client()).await??.log(ctx, severity, payload).await
    }

    /// Logs through the client, handling failures according to the [`OnFailure`] policy.
    pub async fn log<L: Loggable + Debug + ?Sized>(
        &self,
        ctx: &Context,
        severity: Severity,
        payload: &L,
    ) {
        let client = match ctx.run(self.client()).await {
            Ok(Ok(client)) => client,
            Ok(Err(err)) | Err(err) => {
                self.report("Could not create client to log payload", payload, &err);
                return;
            }
        };
        if let Err(err) = client.log(ctx, severity, payload).await {
            self.report("Could not log payload", payload, &err);
        }
    }

    fn report<P: Debug + ?Sized>(&self, msg: &str, payload: &P, err: &Error) {
        if self.on_failure == OnFailure::Log {
            error!(self.diagnostics, "{}", msg; "payload" => ?payload, "error" => %err);
        }
    }
}

static GLOBAL: OnceLock<LazyClient> = OnceLock::new();

/// Installs the client used by the functions in this module. Must happen before their first use.
///
/// # Errors
///
/// Gives `client` back if a client was installed or created before.
pub fn install(client: LazyClient) -> Result<(), LazyClient> {
    GLOBAL.set(client)
}

fn global() -> &'static LazyClient {
    GLOBAL.get_or_init(LazyClient::from_env)
}

/// Logs with the process-wide client. Failures are never returned.
pub async fn log<L: Loggable + Debug + ?Sized>(ctx: &Context, severity: Severity, payload: &L) {
    global().log(ctx, severity, payload).await
}

/// Calls [`log`] with the severity set to Debug
pub async fn debug<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Debug, payload).await
}

/// Calls [`log`] with the severity set to Info
pub async fn info<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Info, payload).await
}

/// Calls [`log`] with the severity set to Notice
pub async fn notice<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Notice, payload).await
}

/// Calls [`log`] with the severity set to Warning
pub async fn warn<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Warning, payload).await
}

/// Calls [`log`] with the severity set to Error
pub async fn error<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Error, payload).await
}

/// Calls [`log`] with the severity set to Critical
pub async fn critical<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Critical, payload).await
}

/// Calls [`log`] with the severity set to Alert
pub async fn alert<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Alert, payload).await
}

/// Calls [`log`] with the severity set to Emergency
pub async fn emergency<L: Loggable + Debug + ?Sized>(ctx: &Context, payload: &L) {
    log(ctx, Severity::Emergency, payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use pretty_assertions::assert_eq;
    use slog::{o, Drain, Never, OwnedKVList, Record};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl Drain for Collect {
        type Ok = ();
        type Err = Never;
        fn log(&self, record: &Record, _: &OwnedKVList) -> Result<(), Never> {
            self.0.lock().unwrap().push(record.msg().to_string());
            Ok(())
        }
    }

    impl Collect {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn config() -> Config {
        Config::new("my-project", "my-function", "europe-west1")
    }

    fn lazy(transport: Arc<RecordingTransport>, calls: Arc<AtomicUsize>) -> LazyClient {
        LazyClient::new(move || {
            let transport = transport.clone();
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Client::with_transport(&config(), transport))
            }
        })
    }

    // Fails the first `failures` attempts.
    fn flaky(
        transport: Arc<RecordingTransport>,
        calls: Arc<AtomicUsize>,
        failures: usize,
    ) -> LazyClient {
        LazyClient::new(move || {
            let transport = transport.clone();
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < failures {
                    Err(Error::Configuration("no credentials".into()))
                } else {
                    Ok(Client::with_transport(&config(), transport))
                }
            }
        })
    }

    #[tokio::test]
    async fn client_is_created_on_first_use_only() {
        let transport = Arc::new(RecordingTransport::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = lazy(transport.clone(), calls.clone());
        assert!(!lazy.is_ready());

        let ctx = Context::background();
        lazy.log(&ctx, Severity::Info, "one").await;
        lazy.log(&ctx, Severity::Debug, "two").await;

        assert!(lazy.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_use_creates_one_client() {
        let transport = Arc::new(RecordingTransport::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = Arc::new(lazy(transport.clone(), calls.clone()));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let lazy = lazy.clone();
                tokio::spawn(async move {
                    lazy.log(&Context::background(), Severity::Info, &format!("entry {i}"))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.requests().len(), 16);
    }

    #[tokio::test]
    async fn failed_construction_is_reported_and_retried() {
        let transport = Arc::new(RecordingTransport::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let collect = Collect::default();
        let lazy = flaky(transport.clone(), calls.clone(), 1)
            .with_diagnostics(slog::Logger::root(collect.clone(), o!()));

        let ctx = Context::background();
        lazy.log(&ctx, Severity::Info, "dropped").await;
        assert!(!lazy.is_ready());
        assert!(transport.requests().is_empty());
        assert_eq!(collect.messages(), vec!["Could not create client to log payload"]);

        lazy.log(&ctx, Severity::Info, "kept").await;
        assert!(lazy.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn submission_failure_is_reported() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_with(Some("backend unavailable"));
        let collect = Collect::default();
        let lazy = lazy(transport, Arc::new(AtomicUsize::new(0)))
            .with_diagnostics(slog::Logger::root(collect.clone(), o!()));

        lazy.log(&Context::background(), Severity::Error, "lost").await;
        assert_eq!(collect.messages(), vec!["Could not log payload"]);
    }

    #[tokio::test]
    async fn silent_policy_reports_nothing() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_with(Some("backend unavailable"));
        let collect = Collect::default();
        let lazy = flaky(transport, Arc::new(AtomicUsize::new(0)), 1)
            .with_diagnostics(slog::Logger::root(collect.clone(), o!()))
            .with_on_failure(OnFailure::Silent);

        let ctx = Context::background();
        lazy.log(&ctx, Severity::Error, "construction fails").await;
        lazy.log(&ctx, Severity::Error, "submission fails").await;
        assert!(collect.messages().is_empty());
    }

    #[tokio::test]
    async fn try_log_propagates() {
        let transport = Arc::new(RecordingTransport::new());
        let lazy = flaky(transport.clone(), Arc::new(AtomicUsize::new(0)), 1);
        let ctx = Context::background();

        let err = lazy.try_log(&ctx, Severity::Info, "x").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        transport.fail_with(Some("rejected"));
        let err = lazy.try_log(&ctx, Severity::Info, "x").await.unwrap_err();
        assert!(matches!(err, Error::Submission(_)));

        transport.fail_with(None);
        lazy.try_log(&ctx, Severity::Info, "x").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn caller_deadline_bounds_the_wait_for_construction() {
        let transport = Arc::new(RecordingTransport::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let collect = Collect::default();
        let lazy = {
            let transport = transport.clone();
            let calls = calls.clone();
            LazyClient::new(move || {
                let transport = transport.clone();
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        std::future::pending::<()>().await;
                    }
                    Ok(Client::with_transport(&config(), transport))
                }
            })
            .with_diagnostics(slog::Logger::root(collect.clone(), o!()))
        };

        let ctx = Context::background().with_timeout(Duration::from_millis(200));
        lazy.log(&ctx, Severity::Info, "too late").await;
        assert!(!lazy.is_ready());
        assert!(transport.requests().is_empty());
        assert_eq!(collect.messages(), vec!["Could not create client to log payload"]);

        lazy.log(&Context::background(), Severity::Info, "on time").await;
        assert!(lazy.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn try_log_with_cancelled_context_does_not_wait_for_construction() {
        let transport = Arc::new(RecordingTransport::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let lazy = lazy(transport.clone(), calls.clone());

        let ctx = Context::background();
        ctx.cancel();
        let err = lazy.try_log(&ctx, Severity::Info, "x").await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(!lazy.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn construction_does_not_use_the_callers_context() {
        let transport = Arc::new(RecordingTransport::new().with_delay(Duration::from_secs(1)));
        let collect = Collect::default();
        let lazy = lazy(transport.clone(), Arc::new(AtomicUsize::new(0)))
            .with_diagnostics(slog::Logger::root(collect.clone(), o!()));

        // Long enough for construction, too short for the submission.
        let ctx = Context::background().with_timeout(Duration::from_millis(500));
        lazy.log(&ctx, Severity::Info, "late").await;

        assert!(lazy.is_ready());
        assert!(transport.requests().is_empty());
        assert_eq!(collect.messages(), vec!["Could not log payload"]);
    }
}
