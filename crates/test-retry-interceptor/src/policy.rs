use std::sync::Arc;
use test_retry_core::TestOutcome;

/// The retry decision supplied by the test framework configuration.
///
/// One instance exists per retry group and is shared by every attempt of
/// that group, possibly from several threads at once. Policies that count
/// attempts must therefore use interior mutability (e.g. atomics).
///
/// Panics raised by `should_retry` are not caught by the interceptor.
pub trait RetryPolicy: Send + Sync {
    /// Returns `true` if the finished attempt should be run again.
    fn should_retry(&self, outcome: &TestOutcome) -> bool;
}

/// Shared handle to a policy instance owned by the registry.
pub type SharedPolicy = Arc<dyn RetryPolicy>;

/// A closure-backed retry policy.
///
/// # Examples
///
/// ```
/// use test_retry_interceptor::{FnPolicy, RetryPolicy};
/// use test_retry_core::{Failure, TestContext, TestMethod, TestOutcome};
///
/// let policy = FnPolicy::new(|outcome: &TestOutcome| outcome.status().is_failure());
///
/// let outcome = TestOutcome::failure(
///     TestMethod::new("SearchTest", "findsProducts"),
///     TestContext::new("regression", "firefox"),
///     Failure::message("element not found"),
/// );
/// assert!(policy.should_retry(&outcome));
/// ```
pub struct FnPolicy<F>
where
    F: Fn(&TestOutcome) -> bool + Send + Sync,
{
    f: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&TestOutcome) -> bool + Send + Sync,
{
    /// Wraps a closure as a policy.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> RetryPolicy for FnPolicy<F>
where
    F: Fn(&TestOutcome) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: &TestOutcome) -> bool {
        (self.f)(outcome)
    }
}
