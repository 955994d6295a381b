//! Test identity and attempt outcome model.
//!
//! A [`TestOutcome`] is produced by the host runner once an attempt has
//! finished. The retry coordination code only ever reads it.

use crate::failure::Failure;
use std::fmt;
use std::sync::Arc;

/// Identity of a test method: the owning class (or module path) and the
/// method name.
///
/// Two attempts of the same method always carry equal `TestMethod` values,
/// which is what lets retry state be grouped across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestMethod {
    class_name: Arc<str>,
    method_name: Arc<str>,
}

impl TestMethod {
    /// Creates a method identity.
    pub fn new(class_name: impl Into<Arc<str>>, method_name: impl Into<Arc<str>>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }

    /// The owning class or module path.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The bare method name.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Renders `class.method`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method_name)
    }
}

impl fmt::Display for TestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_name, self.method_name)
    }
}

/// Execution context an attempt ran in.
///
/// Used to look up configuration (e.g. a suite-wide retry policy). It is not
/// part of a method's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestContext {
    suite_name: Arc<str>,
    test_name: Arc<str>,
}

impl TestContext {
    /// Creates a context for the given suite and test run.
    pub fn new(suite_name: impl Into<Arc<str>>, test_name: impl Into<Arc<str>>) -> Self {
        Self {
            suite_name: suite_name.into(),
            test_name: test_name.into(),
        }
    }

    /// Name of the suite.
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Name of the test run inside the suite.
    pub fn test_name(&self) -> &str {
        &self.test_name
    }
}

impl fmt::Display for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.suite_name, self.test_name)
    }
}

/// Final status of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestStatus {
    /// The attempt passed.
    Success,
    /// The attempt failed with an assertion or error.
    Failure,
    /// The attempt was skipped.
    Skip,
}

impl TestStatus {
    /// Returns `true` for [`TestStatus::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Failure)
    }
}

/// Read-only view of a completed test attempt.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    method: TestMethod,
    context: TestContext,
    status: TestStatus,
    failure: Option<Failure>,
}

impl TestOutcome {
    /// Creates an outcome from all of its parts.
    pub fn new(
        method: TestMethod,
        context: TestContext,
        status: TestStatus,
        failure: Option<Failure>,
    ) -> Self {
        Self {
            method,
            context,
            status,
            failure,
        }
    }

    /// A passing attempt.
    pub fn success(method: TestMethod, context: TestContext) -> Self {
        Self::new(method, context, TestStatus::Success, None)
    }

    /// A failing attempt with its captured failure.
    pub fn failure(method: TestMethod, context: TestContext, failure: Failure) -> Self {
        Self::new(method, context, TestStatus::Failure, Some(failure))
    }

    /// The method this attempt executed.
    pub fn method(&self) -> &TestMethod {
        &self.method
    }

    /// The context this attempt ran in.
    pub fn context(&self) -> &TestContext {
        &self.context
    }

    /// The attempt's status.
    pub fn status(&self) -> TestStatus {
        self.status
    }

    /// The captured failure, if the attempt produced one.
    pub fn failure_cause(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }
}
