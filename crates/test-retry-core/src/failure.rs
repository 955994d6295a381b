//! Failure capture and diagnostic trace rendering.
//!
//! A [`Failure`] keeps the original error value of a failed attempt together
//! with its type name and, when backtraces are enabled, the call stack at
//! capture time. [`format_trace`] turns it into the single diagnostic string
//! that is reported as the retry reason.

use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Boxed error type accepted from host runners and policy factories.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Plain-text failure without a dedicated error type.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// Why rendering a trace stopped early.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FormattingError {
    #[error("error Display implementation panicked")]
    Panicked,
    #[error("formatter reported an error")]
    Fmt(#[from] fmt::Error),
}

/// The captured error of a failed test attempt.
///
/// Cloning is cheap; the error and backtrace are shared.
#[derive(Debug, Clone)]
pub struct Failure {
    error: Arc<dyn Error + Send + Sync + 'static>,
    type_name: Option<&'static str>,
    backtrace: Option<Arc<Backtrace>>,
}

impl Failure {
    /// Captures an error value.
    ///
    /// A backtrace is recorded when `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`
    /// enable it.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            error: Arc::new(error),
            type_name: Some(std::any::type_name::<E>()),
            backtrace: capture_backtrace(),
        }
    }

    /// Captures an already boxed error. The concrete type name is unknown.
    pub fn from_boxed(error: BoxError) -> Self {
        Self {
            error: Arc::from(error),
            type_name: None,
            backtrace: capture_backtrace(),
        }
    }

    /// A failure described only by a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error: Arc::new(Message(message.into())),
            type_name: None,
            backtrace: capture_backtrace(),
        }
    }

    /// Captures a panic payload as returned by [`std::panic::catch_unwind`].
    ///
    /// Assertion failures in Rust test bodies surface this way.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        Self {
            error: Arc::new(Message(message)),
            type_name: Some("panic"),
            backtrace: capture_backtrace(),
        }
    }

    /// Replaces the captured backtrace, e.g. with one recorded by the host.
    pub fn with_backtrace(mut self, backtrace: Backtrace) -> Self {
        self.backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(Arc::new(backtrace)),
            _ => None,
        };
        self
    }

    /// Drops the captured backtrace.
    pub fn without_backtrace(mut self) -> Self {
        self.backtrace = None;
        self
    }

    /// The original error.
    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.error
    }

    /// Type name of the original error, when known.
    pub fn type_name(&self) -> Option<&'static str> {
        self.type_name
    }

    /// The backtrace recorded at capture time, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_deref()
    }

    fn render(&self, out: &mut String) -> Result<(), FormattingError> {
        if let Some(type_name) = self.type_name {
            write!(out, "{}: ", type_name)?;
        }
        write!(out, "{}", self.error)?;

        if let Some(backtrace) = &self.backtrace {
            write!(out, "\n{}", backtrace)?;
        }

        let mut source = self.error.source();
        while let Some(cause) = source {
            write!(out, "\nCaused by: {}", cause)?;
            source = cause.source();
        }
        Ok(())
    }
}

fn capture_backtrace() -> Option<Arc<Backtrace>> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => Some(Arc::new(backtrace)),
        _ => None,
    }
}

/// Renders the full diagnostic text of a failure.
///
/// The text contains the error type and message, the captured backtrace and
/// one `Caused by:` line per source in the error chain. Returns an empty
/// string when there is no failure.
///
/// Never panics. If rendering fails part way (including a panicking
/// `Display` implementation) whatever was rendered so far is returned.
///
/// A panicking `Display` is caught here, but the process-wide panic hook
/// still runs first: with the default hook a panic report is printed to
/// stderr even though the trace is returned normally. Hosts that want quiet
/// output install their own hook with [`std::panic::set_hook`].
///
/// # Examples
///
/// ```
/// use test_retry_core::{format_trace, Failure};
///
/// let failure = Failure::message("expected 200, got 503").without_backtrace();
/// assert_eq!(format_trace(Some(&failure)), "expected 200, got 503");
/// assert_eq!(format_trace(None), "");
/// ```
pub fn format_trace(failure: Option<&Failure>) -> String {
    let Some(failure) = failure else {
        return String::new();
    };

    let mut out = String::new();
    let result = panic::catch_unwind(AssertUnwindSafe(|| failure.render(&mut out)))
        .unwrap_or(Err(FormattingError::Panicked));

    if let Err(_error) = result {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %_error, partial_len = out.len(), "failure trace truncated");
    }

    out
}
