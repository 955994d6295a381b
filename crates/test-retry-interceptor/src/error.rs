use crate::factory::PolicyDescriptor;
use test_retry_core::failure::BoxError;

/// Errors raised while resolving the retry policy of a test method.
///
/// All variants are fatal for the current decision and are returned to the
/// host runner unchanged. Each message names the test method so the
/// configuration can be fixed.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// No retry policy is configured for the method.
    #[error("no retry policy is configured for test method `{method}`")]
    NotConfigured {
        /// Qualified name of the test method.
        method: String,
    },

    /// A policy is configured but the factory could not create it.
    #[error("retry policy `{policy}` for test method `{method}` could not be instantiated")]
    Instantiation {
        /// Qualified name of the test method.
        method: String,
        /// The configured policy.
        policy: PolicyDescriptor,
        /// Error reported by the factory.
        #[source]
        source: BoxError,
    },

    /// The method was first resolved with another policy in the same test
    /// context. Within one context a method keeps a single policy for as long
    /// as the registry lives.
    #[error(
        "test method `{method}` is bound to retry policy `{bound}`, but `{requested}` is configured now"
    )]
    PolicyChanged {
        /// Qualified name of the test method.
        method: String,
        /// Policy the method was first resolved with.
        bound: PolicyDescriptor,
        /// Policy configured for this attempt.
        requested: PolicyDescriptor,
    },
}

impl ResolutionError {
    /// Qualified name of the test method that failed to resolve.
    pub fn method(&self) -> &str {
        match self {
            ResolutionError::NotConfigured { method }
            | ResolutionError::Instantiation { method, .. }
            | ResolutionError::PolicyChanged { method, .. } => method,
        }
    }

    /// Short machine-readable reason, used as event and metric label.
    pub fn reason(&self) -> &'static str {
        match self {
            ResolutionError::NotConfigured { .. } => "not_configured",
            ResolutionError::Instantiation { .. } => "instantiation",
            ResolutionError::PolicyChanged { .. } => "policy_changed",
        }
    }
}
