//! Policy discovery capability.

use crate::policy::SharedPolicy;
use std::fmt;
use std::sync::Arc;
use test_retry_core::failure::BoxError;
use test_retry_core::{TestContext, TestMethod};

/// Opaque name of a retry policy variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyDescriptor(Arc<str>);

impl PolicyDescriptor {
    /// Creates a descriptor from a policy name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The policy name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolicyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolicyDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PolicyDescriptor {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Finds and creates the retry policy configured for a test method.
///
/// `resolve_descriptor` must be deterministic for a given method and
/// context; it is called on every decision to build the retry group key.
/// `instantiate` is called at most once per retry group.
pub trait PolicyFactory: Send + Sync {
    /// Returns the policy configured for the method, if any.
    fn resolve_descriptor(
        &self,
        method: &TestMethod,
        context: &TestContext,
    ) -> Option<PolicyDescriptor>;

    /// Creates a fresh instance of the described policy.
    fn instantiate(&self, descriptor: &PolicyDescriptor) -> Result<SharedPolicy, BoxError>;
}

impl<F> PolicyFactory for Arc<F>
where
    F: PolicyFactory + ?Sized,
{
    fn resolve_descriptor(
        &self,
        method: &TestMethod,
        context: &TestContext,
    ) -> Option<PolicyDescriptor> {
        (**self).resolve_descriptor(method, context)
    }

    fn instantiate(&self, descriptor: &PolicyDescriptor) -> Result<SharedPolicy, BoxError> {
        (**self).instantiate(descriptor)
    }
}
