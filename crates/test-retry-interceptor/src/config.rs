use crate::events::InterceptorEvent;
use crate::factory::PolicyFactory;
use crate::registry::RetryRegistry;
use crate::reporter::{NoopReporter, RetryReporter};
use std::sync::Arc;
use test_retry_core::events::{EventListeners, FnListener, SharedEventListener};

/// Configuration shared by all clones of a [`RetryInterceptor`](crate::RetryInterceptor).
pub struct InterceptorConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<InterceptorEvent>,
}

/// Builder for [`RetryInterceptor`](crate::RetryInterceptor).
pub struct InterceptorConfigBuilder {
    factory: Arc<dyn PolicyFactory>,
    registry: Option<Arc<RetryRegistry>>,
    reporter: Arc<dyn RetryReporter>,
    event_listeners: EventListeners<InterceptorEvent>,
    name: String,
}

impl InterceptorConfigBuilder {
    /// Creates a new builder around a policy factory.
    ///
    /// Defaults:
    /// - registry: a fresh, private [`RetryRegistry`]
    /// - reporter: [`NoopReporter`]
    /// - name: `"<unnamed>"`
    pub fn new(factory: Arc<dyn PolicyFactory>) -> Self {
        Self {
            factory,
            registry: None,
            reporter: Arc::new(NoopReporter),
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets the name for this interceptor (used in events, logs and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Shares an existing registry.
    ///
    /// Interceptors built with the same registry share policy instances and
    /// attempt counters.
    pub fn registry(mut self, registry: Arc<RetryRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the reporter that receives retry progress.
    pub fn reporter<R>(mut self, reporter: R) -> Self
    where
        R: RetryReporter + 'static,
    {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Registers a callback when a method enters its retry sequence.
    ///
    /// # Callback Signature
    /// `Fn(&str)` - Called with the qualified method name.
    pub fn on_retry_started<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::RetryStarted { method, .. } = event {
                f(method);
            }
        }));
        self
    }

    /// Registers a callback when a failed attempt is going to be retried.
    ///
    /// # Callback Signature
    /// `Fn(&str, usize)` - Called with the qualified method name and the
    /// attempt index (1 = first retry).
    ///
    /// # Example
    /// ```rust
    /// use test_retry_interceptor::{FnPolicy, PolicyCatalog, RetryInterceptor};
    /// use test_retry_core::TestOutcome;
    ///
    /// let catalog = PolicyCatalog::builder()
    ///     .register("always", || FnPolicy::new(|_: &TestOutcome| true))
    ///     .default_policy("always")
    ///     .build();
    ///
    /// let interceptor = RetryInterceptor::builder(catalog)
    ///     .on_retry_scheduled(|method, attempt| {
    ///         println!("{} will run again (retry #{})", method, attempt);
    ///     })
    ///     .build();
    /// ```
    pub fn on_retry_scheduled<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::RetryScheduled {
                method, attempt, ..
            } = event
            {
                f(method, *attempt);
            }
        }));
        self
    }

    /// Registers a callback when a retry sequence finishes.
    ///
    /// # Callback Signature
    /// `Fn(&str, usize)` - Called with the qualified method name and the
    /// number of retries scheduled for the group so far.
    pub fn on_retry_finished<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::RetryFinished {
                method, retries, ..
            } = event
            {
                f(method, *retries);
            }
        }));
        self
    }

    /// Registers a callback when a method's policy cannot be resolved.
    ///
    /// # Callback Signature
    /// `Fn(&str, &'static str)` - Called with the qualified method name and
    /// the reason (`"not_configured"`, `"instantiation"` or `"policy_changed"`).
    pub fn on_resolution_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let InterceptorEvent::ResolutionFailed { method, reason, .. } = event {
                f(method, *reason);
            }
        }));
        self
    }

    /// Registers a listener that receives every [`InterceptorEvent`].
    ///
    /// The listener is shared, so one instance can observe several
    /// interceptors (one per worker, say).
    pub fn event_listener(mut self, listener: SharedEventListener<InterceptorEvent>) -> Self {
        self.event_listeners.add_shared(listener);
        self
    }

    /// Builds the interceptor.
    pub fn build(self) -> crate::RetryInterceptor {
        #[cfg(feature = "metrics")]
        {
            use metrics::describe_counter;
            describe_counter!(
                "test_retry_decisions_total",
                "Total number of retry decisions, by decision (retry or finished)"
            );
            describe_counter!(
                "test_retry_policies_created_total",
                "Total number of retry policy instances created"
            );
            describe_counter!(
                "test_retry_resolution_failures_total",
                "Total number of decisions aborted because no policy could be resolved"
            );
        }

        let config = InterceptorConfig {
            name: self.name,
            event_listeners: self.event_listeners,
        };

        crate::RetryInterceptor::from_parts(
            self.factory,
            self.registry.unwrap_or_default(),
            self.reporter,
            Arc::new(config),
        )
    }
}
