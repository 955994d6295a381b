//! Retry decision interceptor for test runners.
//!
//! The host test framework calls [`RetryInterceptor::decide`] once for every
//! finished attempt of a test method. The interceptor:
//!
//! - finds the retry policy configured for the method through a
//!   [`PolicyFactory`] and keeps exactly one instance of it per retry group
//! - asks that policy whether the attempt should run again
//! - reports the result to a [`RetryReporter`]: retry started, the failure
//!   reason with a strictly increasing attempt index, or retry finished
//!
//! Shared state lives in a [`RetryRegistry`], an injectable concurrent store
//! that several interceptors (one per worker, say) can share.
//!
//! # Examples
//!
//! ```
//! use test_retry_interceptor::{FnPolicy, PolicyCatalog, RetryInterceptor};
//! use test_retry_core::{Failure, TestContext, TestMethod, TestOutcome};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! // Retry each failing method up to two times.
//! let catalog = PolicyCatalog::builder()
//!     .register("two-retries", || {
//!         let used = AtomicUsize::new(0);
//!         FnPolicy::new(move |outcome: &TestOutcome| {
//!             outcome.status().is_failure() && used.fetch_add(1, Ordering::SeqCst) < 2
//!         })
//!     })
//!     .default_policy("two-retries")
//!     .build();
//!
//! let interceptor = RetryInterceptor::builder(catalog)
//!     .name("nightly-agent")
//!     .on_retry_scheduled(|method, attempt| println!("retrying {} (#{})", method, attempt))
//!     .build();
//!
//! let outcome = TestOutcome::failure(
//!     TestMethod::new("com.acme.CheckoutTest", "paysWithCard"),
//!     TestContext::new("nightly", "chrome"),
//!     Failure::message("payment widget did not load"),
//! );
//!
//! assert!(interceptor.decide(&outcome)?);
//! assert!(interceptor.decide(&outcome)?);
//! assert!(!interceptor.decide(&outcome)?);
//! # Ok::<(), test_retry_interceptor::ResolutionError>(())
//! ```

mod catalog;
mod config;
mod error;
mod events;
mod factory;
mod key;
mod policy;
mod registry;
mod reporter;

pub use catalog::{PolicyCatalog, PolicyCatalogBuilder, UnknownPolicy};
pub use config::{InterceptorConfig, InterceptorConfigBuilder};
pub use error::ResolutionError;
pub use events::InterceptorEvent;
pub use factory::{PolicyDescriptor, PolicyFactory};
pub use key::{build_retry_group_key, RetryGroupKey};
pub use policy::{FnPolicy, RetryPolicy, SharedPolicy};
pub use registry::RetryRegistry;
pub use reporter::{NoopReporter, RetryReporter};

use std::sync::Arc;
use std::time::Instant;
use test_retry_core::{format_trace, TestContext, TestMethod, TestOutcome};

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

/// Decides, per finished attempt, whether a test method runs again.
///
/// Cloning is cheap; clones share the factory, registry, reporter and
/// configuration.
pub struct RetryInterceptor {
    factory: Arc<dyn PolicyFactory>,
    registry: Arc<RetryRegistry>,
    reporter: Arc<dyn RetryReporter>,
    config: Arc<InterceptorConfig>,
}

impl RetryInterceptor {
    /// Creates a new builder around a policy factory.
    pub fn builder<F>(factory: F) -> InterceptorConfigBuilder
    where
        F: PolicyFactory + 'static,
    {
        InterceptorConfigBuilder::new(Arc::new(factory))
    }

    pub(crate) fn from_parts(
        factory: Arc<dyn PolicyFactory>,
        registry: Arc<RetryRegistry>,
        reporter: Arc<dyn RetryReporter>,
        config: Arc<InterceptorConfig>,
    ) -> Self {
        Self {
            factory,
            registry,
            reporter,
            config,
        }
    }

    /// The interceptor's configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The registry holding policy instances and attempt counters.
    pub fn registry(&self) -> &Arc<RetryRegistry> {
        &self.registry
    }

    /// The retry group key of a method, or `None` if no policy is configured.
    pub fn group_key(&self, method: &TestMethod, context: &TestContext) -> Option<RetryGroupKey> {
        build_retry_group_key(&*self.factory, method, context)
    }

    /// Makes the retry decision for one finished attempt.
    ///
    /// Returns `Ok(true)` if the host should schedule another attempt. On a
    /// retry the reporter receives `retry_started` (first retry of the group
    /// only) followed by `retry_failure_reason` with the next attempt index;
    /// otherwise it receives `retry_finished`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolutionError`] if the method has no usable policy. In
    /// that case nothing is reported and no registry entry is created.
    ///
    /// # Panics
    ///
    /// Panics raised by the policy propagate to the caller.
    pub fn decide(&self, outcome: &TestOutcome) -> Result<bool, ResolutionError> {
        let method = outcome.method();
        let context = outcome.context();

        let key = match self.group_key(method, context) {
            Some(key) => key,
            None => {
                return Err(self.resolution_failed(ResolutionError::NotConfigured {
                    method: method.qualified_name(),
                }))
            }
        };

        let policy = self
            .registry
            .resolve_policy(&key, context, || self.instantiate(&key))
            .map_err(|err| self.resolution_failed(err))?;

        let need_retry = policy.should_retry(outcome);
        if need_retry {
            let message = format_trace(outcome.failure_cause());
            let attempt = self.registry.next_attempt_index(&key);

            if attempt == 1 {
                self.reporter.retry_started(method, context);
                self.emit(method, |interceptor, name| InterceptorEvent::RetryStarted {
                    interceptor,
                    method: name,
                    timestamp: Instant::now(),
                });
            }
            self.reporter
                .retry_failure_reason(attempt, &message, method, context);
            self.emit(method, |interceptor, name| InterceptorEvent::RetryScheduled {
                interceptor,
                method: name,
                timestamp: Instant::now(),
                attempt,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("test_retry_decisions_total", "interceptor" => self.config.name.clone(), "decision" => "retry")
                    .increment(1);
            }

            #[cfg(feature = "tracing")]
            debug!(
                interceptor = %self.config.name,
                method = %method,
                context = %context,
                attempt,
                "retry scheduled"
            );
        } else {
            let retries = self.registry.attempt_index(&key);
            self.reporter.retry_finished(method, context);
            self.emit(method, |interceptor, name| InterceptorEvent::RetryFinished {
                interceptor,
                method: name,
                timestamp: Instant::now(),
                retries,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("test_retry_decisions_total", "interceptor" => self.config.name.clone(), "decision" => "finished")
                    .increment(1);
            }

            #[cfg(feature = "tracing")]
            debug!(
                interceptor = %self.config.name,
                method = %method,
                context = %context,
                retries,
                "retry finished"
            );
        }

        Ok(need_retry)
    }

    fn instantiate(&self, key: &RetryGroupKey) -> Result<SharedPolicy, ResolutionError> {
        let policy = self
            .factory
            .instantiate(key.policy())
            .map_err(|source| ResolutionError::Instantiation {
                method: key.method().qualified_name(),
                policy: key.policy().clone(),
                source,
            })?;

        #[cfg(feature = "metrics")]
        {
            counter!("test_retry_policies_created_total", "interceptor" => self.config.name.clone(), "policy" => key.policy().to_string())
                .increment(1);
        }

        #[cfg(feature = "tracing")]
        trace!(interceptor = %self.config.name, group = %key, "retry policy instantiated");

        Ok(policy)
    }

    fn resolution_failed(&self, err: ResolutionError) -> ResolutionError {
        let reason = err.reason();
        if !self.config.event_listeners.is_empty() {
            self.config
                .event_listeners
                .emit(&InterceptorEvent::ResolutionFailed {
                    interceptor: self.config.name.clone(),
                    method: err.method().to_string(),
                    timestamp: Instant::now(),
                    reason,
                });
        }

        #[cfg(feature = "metrics")]
        {
            counter!("test_retry_resolution_failures_total", "interceptor" => self.config.name.clone(), "reason" => reason)
                .increment(1);
        }

        #[cfg(feature = "tracing")]
        warn!(interceptor = %self.config.name, reason, error = %err, "retry policy resolution failed");

        err
    }

    /// Emits an event built from the interceptor and method names, skipping
    /// the allocation when nobody listens.
    fn emit<F>(&self, method: &TestMethod, build: F)
    where
        F: FnOnce(String, String) -> InterceptorEvent,
    {
        if self.config.event_listeners.is_empty() {
            return;
        }
        let event = build(self.config.name.clone(), method.qualified_name());
        self.config.event_listeners.emit(&event);
    }
}

impl Clone for RetryInterceptor {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            registry: Arc::clone(&self.registry),
            reporter: Arc::clone(&self.reporter),
            config: Arc::clone(&self.config),
        }
    }
}

impl std::fmt::Debug for RetryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("name", &self.config.name)
            .field("registry", &self.registry)
            .field("listeners", &self.config.event_listeners.len())
            .finish()
    }
}
