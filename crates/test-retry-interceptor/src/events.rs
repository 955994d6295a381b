use std::time::Instant;
use test_retry_core::events::RetryEvent;

/// Events emitted by the retry interceptor.
#[derive(Debug, Clone)]
pub enum InterceptorEvent {
    /// The first retry of a group was scheduled.
    RetryStarted {
        interceptor: String,
        method: String,
        timestamp: Instant,
    },
    /// A failed attempt will be retried.
    RetryScheduled {
        interceptor: String,
        method: String,
        timestamp: Instant,
        attempt: usize,
    },
    /// The policy declined another attempt.
    RetryFinished {
        interceptor: String,
        method: String,
        timestamp: Instant,
        retries: usize,
    },
    /// The method's policy could not be resolved.
    ResolutionFailed {
        interceptor: String,
        method: String,
        timestamp: Instant,
        reason: &'static str,
    },
}

impl RetryEvent for InterceptorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InterceptorEvent::RetryStarted { .. } => "retry_started",
            InterceptorEvent::RetryScheduled { .. } => "retry_scheduled",
            InterceptorEvent::RetryFinished { .. } => "retry_finished",
            InterceptorEvent::ResolutionFailed { .. } => "resolution_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            InterceptorEvent::RetryStarted { timestamp, .. }
            | InterceptorEvent::RetryScheduled { timestamp, .. }
            | InterceptorEvent::RetryFinished { timestamp, .. }
            | InterceptorEvent::ResolutionFailed { timestamp, .. } => *timestamp,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            InterceptorEvent::RetryStarted { interceptor, .. }
            | InterceptorEvent::RetryScheduled { interceptor, .. }
            | InterceptorEvent::RetryFinished { interceptor, .. }
            | InterceptorEvent::ResolutionFailed { interceptor, .. } => interceptor,
        }
    }

    fn method_name(&self) -> &str {
        match self {
            InterceptorEvent::RetryStarted { method, .. }
            | InterceptorEvent::RetryScheduled { method, .. }
            | InterceptorEvent::RetryFinished { method, .. }
            | InterceptorEvent::ResolutionFailed { method, .. } => method,
        }
    }
}
