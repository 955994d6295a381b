use crate::factory::{PolicyDescriptor, PolicyFactory};
use std::fmt;
use test_retry_core::{TestContext, TestMethod};

/// Identifies a retry group: one test method combined with its configured
/// policy.
///
/// The key depends on nothing else. Attempt counts, failures and the
/// execution context never change it, so every attempt of a method lands in
/// the same registry entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RetryGroupKey {
    method: TestMethod,
    policy: PolicyDescriptor,
}

impl RetryGroupKey {
    /// Creates a key for the method and policy.
    pub fn new(method: TestMethod, policy: PolicyDescriptor) -> Self {
        Self { method, policy }
    }

    /// The test method.
    pub fn method(&self) -> &TestMethod {
        &self.method
    }

    /// The configured policy.
    pub fn policy(&self) -> &PolicyDescriptor {
        &self.policy
    }
}

impl fmt::Display for RetryGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.method, self.policy)
    }
}

/// Builds the retry group key for a method, or `None` when the factory has
/// no policy configured for it.
pub fn build_retry_group_key<F>(
    factory: &F,
    method: &TestMethod,
    context: &TestContext,
) -> Option<RetryGroupKey>
where
    F: PolicyFactory + ?Sized,
{
    factory
        .resolve_descriptor(method, context)
        .map(|policy| RetryGroupKey::new(method.clone(), policy))
}
