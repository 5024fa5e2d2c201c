use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Carries cancellation and an optional deadline into a log call.
///
/// Contexts form a tree: cancelling a context cancels every context derived from it, but never
/// its parent. Derived contexts keep the earliest deadline of the chain.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that can be cancelled independently of this one.
    pub fn child(&self) -> Self {
        Context {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.child();
        ctx.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        ctx
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drives `fut` to completion unless the context is cancelled or its deadline passes first,
    /// in which case `fut` is dropped.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = sleep_until(self.deadline) => Err(Error::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 42 }).await.unwrap(), 42);
        assert_eq!(ctx.deadline(), None);
    }

    #[tokio::test]
    async fn cancelled_context_does_not_run() {
        let ctx = Context::background();
        ctx.cancel();
        let result = ctx.run(async { panic!("must not be polled") }).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_pending_work() {
        let ctx = Context::background().with_timeout(Duration::from_millis(100));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_running() {
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn cancellation_flows_to_children_only() {
        let parent = Context::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let other = parent.with_timeout(Duration::from_secs(1));
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn earliest_deadline_wins() {
        let short = Context::background().with_timeout(Duration::from_secs(1));
        let long = short.with_timeout(Duration::from_secs(60));
        assert_eq!(long.deadline(), short.deadline());
    }
}
