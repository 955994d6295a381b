//! Core types for test retry coordination.
//!
//! This crate provides the shared vocabulary used by the retry interceptor
//! and by host test runners that drive it:
//! - Test identity and outcome model ([`TestMethod`], [`TestContext`], [`TestOutcome`])
//! - Failure capture and diagnostic trace rendering ([`Failure`], [`format_trace`])
//! - Event system for observability ([`RetryEvent`], [`EventListeners`])

pub mod events;
pub mod failure;
pub mod outcome;

pub use events::{EventListener, EventListeners, FnListener, RetryEvent, SharedEventListener};
pub use failure::{format_trace, Failure};
pub use outcome::{TestContext, TestMethod, TestOutcome, TestStatus};
