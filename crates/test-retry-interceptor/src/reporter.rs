use std::sync::Arc;
use test_retry_core::{TestContext, TestMethod};

/// Receives retry progress for the reporting pipeline.
///
/// Notifications are fire-and-forget: the interceptor does not wait on or
/// inspect anything the reporter does. Implementations are called from
/// whatever thread finished the attempt.
pub trait RetryReporter: Send + Sync {
    /// The method entered its retry sequence.
    fn retry_started(&self, method: &TestMethod, context: &TestContext);

    /// A failed attempt will be retried. `attempt` is 1 for the first retry
    /// and grows by one per retry of the same group; `message` is the
    /// rendered failure trace, empty if the attempt had no failure.
    fn retry_failure_reason(
        &self,
        attempt: usize,
        message: &str,
        method: &TestMethod,
        context: &TestContext,
    );

    /// The policy declined another attempt; the retry sequence is over.
    fn retry_finished(&self, method: &TestMethod, context: &TestContext);
}

impl<R> RetryReporter for Arc<R>
where
    R: RetryReporter + ?Sized,
{
    fn retry_started(&self, method: &TestMethod, context: &TestContext) {
        (**self).retry_started(method, context)
    }

    fn retry_failure_reason(
        &self,
        attempt: usize,
        message: &str,
        method: &TestMethod,
        context: &TestContext,
    ) {
        (**self).retry_failure_reason(attempt, message, method, context)
    }

    fn retry_finished(&self, method: &TestMethod, context: &TestContext) {
        (**self).retry_finished(method, context)
    }
}

/// Reporter that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl RetryReporter for NoopReporter {
    fn retry_started(&self, _method: &TestMethod, _context: &TestContext) {}

    fn retry_failure_reason(
        &self,
        _attempt: usize,
        _message: &str,
        _method: &TestMethod,
        _context: &TestContext,
    ) {
    }

    fn retry_finished(&self, _method: &TestMethod, _context: &TestContext) {}
}
