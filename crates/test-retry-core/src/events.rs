//! Event system for retry coordination.
//!
//! Interceptors emit typed events describing retry group transitions. Any
//! number of listeners can observe them without affecting the retry decision.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted while coordinating test retries.
pub trait RetryEvent: Send + Sync + fmt::Debug {
    /// Returns the kind of event (e.g., "retry_started", "retry_finished").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the interceptor instance that emitted this event.
    fn source_name(&self) -> &str;

    /// Returns the qualified name of the test method the event is about.
    fn method_name(&self) -> &str;
}

/// Trait for listening to retry events.
pub trait EventListener<E: RetryEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for shared event listeners.
pub type SharedEventListener<E> = Arc<dyn EventListener<E>>;

/// An ordered collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: RetryEvent> {
    listeners: Vec<SharedEventListener<E>>,
}

impl<E: RetryEvent> EventListeners<E> {
    /// Creates a new empty listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the end of the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Adds an already shared listener, e.g. one also registered elsewhere.
    pub fn add_shared(&mut self, listener: SharedEventListener<E>) {
        self.listeners.push(listener);
    }

    /// Emits an event to every listener in registration order.
    ///
    /// A panicking listener is isolated: the panic is caught, the remaining
    /// listeners still run, and the number of listeners that panicked is
    /// returned.
    pub fn emit(&self, event: &E) -> usize {
        let mut panicked = 0;
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
            if result.is_err() {
                panicked += 1;
            }
        }

        #[cfg(feature = "tracing")]
        {
            if panicked > 0 {
                tracing::warn!(
                    event = event.event_type(),
                    method = event.method_name(),
                    panicked,
                    "retry event listener panicked"
                );
            }
        }

        panicked
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: RetryEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RetryEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// A closure-backed event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps a closure as a listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: RetryEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
