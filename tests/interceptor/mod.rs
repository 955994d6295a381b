//! Test organization:
//! - scenarios.rs: retry / finish sequences seen by the reporter
//! - resolution.rs: policy lookup, instantiation and binding failures
//! - concurrency.rs: shared registry under many worker threads
//! - keys.rs: retry group key construction

mod concurrency;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use test_retry_core::{Failure, TestContext, TestMethod, TestOutcome};
use test_retry_interceptor::{PolicyCatalogBuilder, RetryPolicy, RetryReporter};

/// A notification received by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notification {
    Started {
        method: String,
        suite: String,
    },
    FailureReason {
        attempt: usize,
        message: String,
        method: String,
    },
    Finished {
        method: String,
    },
}

/// Reporter that keeps every notification in arrival order.
#[derive(Default)]
pub(crate) struct Recorder {
    notifications: Mutex<Vec<Notification>>,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Drains and returns what was recorded so far.
    pub(crate) fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().unwrap())
    }

    pub(crate) fn attempts_for(&self, method: &str) -> Vec<usize> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .filter_map(|n| match n {
                Notification::FailureReason {
                    attempt, method: m, ..
                } if m == method => Some(*attempt),
                _ => None,
            })
            .collect()
    }
}

impl RetryReporter for Recorder {
    fn retry_started(&self, method: &TestMethod, context: &TestContext) {
        self.notifications.lock().unwrap().push(Notification::Started {
            method: method.qualified_name(),
            suite: context.suite_name().to_string(),
        });
    }

    fn retry_failure_reason(
        &self,
        attempt: usize,
        message: &str,
        method: &TestMethod,
        _context: &TestContext,
    ) {
        self.notifications
            .lock()
            .unwrap()
            .push(Notification::FailureReason {
                attempt,
                message: message.to_string(),
                method: method.qualified_name(),
            });
    }

    fn retry_finished(&self, method: &TestMethod, _context: &TestContext) {
        self.notifications.lock().unwrap().push(Notification::Finished {
            method: method.qualified_name(),
        });
    }
}

/// Retries while it has been asked fewer than `limit` times.
pub(crate) struct UpTo {
    limit: usize,
    asked: AtomicUsize,
}

impl RetryPolicy for UpTo {
    fn should_retry(&self, _outcome: &TestOutcome) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst) < self.limit
    }
}

/// Registers an [`UpTo`] policy under `name` and counts how many instances
/// the catalog creates.
pub(crate) fn register_up_to(
    builder: PolicyCatalogBuilder,
    name: &str,
    limit: usize,
    created: &Arc<AtomicUsize>,
) -> PolicyCatalogBuilder {
    let created = Arc::clone(created);
    builder.register(name.to_string(), move || {
        created.fetch_add(1, Ordering::SeqCst);
        UpTo {
            limit,
            asked: AtomicUsize::new(0),
        }
    })
}

pub(crate) fn method(name: &str) -> TestMethod {
    TestMethod::new("com.acme.StorefrontTest", name)
}

pub(crate) fn context() -> TestContext {
    TestContext::new("regression", "chrome")
}

pub(crate) fn failed(name: &str, message: &str) -> TestOutcome {
    TestOutcome::failure(
        method(name),
        context(),
        Failure::message(message).without_backtrace(),
    )
}
