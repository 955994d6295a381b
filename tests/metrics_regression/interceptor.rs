//! Retry interceptor metrics regression tests

use super::helpers::*;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use test_retry_core::{Failure, TestContext, TestMethod, TestOutcome};
use test_retry_interceptor::{FnPolicy, PolicyCatalog, RetryInterceptor};

fn failed(class: &str) -> TestOutcome {
    TestOutcome::failure(
        TestMethod::new(class, "checkout"),
        TestContext::new("metrics", "run"),
        Failure::message("boom").without_backtrace(),
    )
}

#[test]
#[serial]
fn decision_metrics_exist() {
    init_recorder();

    let catalog = PolicyCatalog::builder()
        .register("once", || {
            let asked = AtomicUsize::new(0);
            FnPolicy::new(move |_: &TestOutcome| asked.fetch_add(1, Ordering::SeqCst) == 0)
        })
        .default_policy("once")
        .build();
    let interceptor = RetryInterceptor::builder(catalog)
        .name("metrics_decisions")
        .build();

    assert!(interceptor.decide(&failed("MetricsTest")).unwrap());
    assert!(!interceptor.decide(&failed("MetricsTest")).unwrap());

    assert_counter_exists("test_retry_decisions_total");
    assert_metric_has_label("test_retry_decisions_total", "interceptor", "metrics_decisions");
    assert_metric_has_label("test_retry_decisions_total", "decision", "retry");
    assert_metric_has_label("test_retry_decisions_total", "decision", "finished");

    assert_counter_exists("test_retry_policies_created_total");
    assert_metric_has_label(
        "test_retry_policies_created_total",
        "interceptor",
        "metrics_decisions",
    );
    assert_metric_has_label("test_retry_policies_created_total", "policy", "once");
}

#[test]
#[serial]
fn resolution_failure_metrics() {
    init_recorder();

    let catalog = PolicyCatalog::builder()
        .assign_class("Unknown", "missing")
        .build();
    let interceptor = RetryInterceptor::builder(catalog)
        .name("metrics_failures")
        .build();

    assert!(interceptor.decide(&failed("Unassigned")).is_err());
    assert!(interceptor.decide(&failed("Unknown")).is_err());

    assert_counter_exists("test_retry_resolution_failures_total");
    assert_metric_has_label(
        "test_retry_resolution_failures_total",
        "interceptor",
        "metrics_failures",
    );
    assert_metric_has_label(
        "test_retry_resolution_failures_total",
        "reason",
        "not_configured",
    );
    assert_metric_has_label(
        "test_retry_resolution_failures_total",
        "reason",
        "instantiation",
    );
}
