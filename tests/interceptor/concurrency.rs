//! Shared registry under many worker threads.

use super::{context, failed, register_up_to, Notification, Recorder};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use test_retry_core::TestMethod;
use test_retry_interceptor::{
    PolicyCatalog, PolicyDescriptor, RetryGroupKey, RetryInterceptor, RetryRegistry,
};

#[test]
fn concurrent_increments_are_exact() {
    let registry = Arc::new(RetryRegistry::new());
    let key = RetryGroupKey::new(
        TestMethod::new("ConcurrencyTest", "counts"),
        PolicyDescriptor::new("up-to"),
    );
    let threads = 16;
    let per_thread = 250;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..per_thread)
                    .map(|_| registry.next_attempt_index(&key))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen: Vec<usize> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    seen.sort_unstable();

    let total = threads * per_thread;
    assert_eq!(seen, (1..=total).collect::<Vec<_>>());
    assert_eq!(registry.attempt_index(&key), total);
}

#[test]
fn concurrent_decisions_share_one_policy_and_sequence() {
    let recorder = Recorder::new();
    let created = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(RetryRegistry::new());
    let threads = 12;
    let limit = 8;

    let catalog = Arc::new(
        register_up_to(PolicyCatalog::builder(), "up-to", limit, &created)
            .default_policy("up-to")
            .build(),
    );
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            // One interceptor per worker, all sharing the registry.
            let interceptor = RetryInterceptor::builder(Arc::clone(&catalog))
                .name(format!("worker-{}", worker))
                .registry(Arc::clone(&registry))
                .reporter(Arc::clone(&recorder))
                .build();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                interceptor
                    .decide(&failed("checksInventory", "stock mismatch"))
                    .unwrap()
            })
        })
        .collect();

    let retries = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|retry| *retry)
        .count();

    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert_eq!(retries, limit);

    let mut attempts = recorder.attempts_for("com.acme.StorefrontTest.checksInventory");
    attempts.sort_unstable();
    assert_eq!(attempts, (1..=limit).collect::<Vec<_>>());

    let notifications = recorder.drain();
    let started = notifications
        .iter()
        .filter(|n| matches!(n, Notification::Started { .. }))
        .count();
    let finished = notifications
        .iter()
        .filter(|n| matches!(n, Notification::Finished { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(finished, threads - limit);
}

#[test]
fn unrelated_methods_do_not_interfere() {
    let created = Arc::new(AtomicUsize::new(0));
    let catalog = register_up_to(PolicyCatalog::builder(), "up-to", 3, &created)
        .default_policy("up-to")
        .build();
    let interceptor = RetryInterceptor::builder(catalog).build();
    let methods = 20;

    let handles: Vec<_> = (0..methods)
        .map(|i| {
            let interceptor = interceptor.clone();
            thread::spawn(move || {
                let name = format!("case{}", i);
                (0..4)
                    .map(|_| interceptor.decide(&failed(&name, "x")).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec![true, true, true, false]);
    }

    assert_eq!(created.load(Ordering::SeqCst), methods);
    assert_eq!(interceptor.registry().policy_count(), methods);
    assert_eq!(interceptor.registry().group_count(), methods);
}

#[test]
fn concurrent_resolution_of_many_keys() {
    let registry = Arc::new(RetryRegistry::new());
    let created = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let created = Arc::clone(&created);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let context = context();
                let mut pointers = HashSet::new();
                for i in 0..50 {
                    let key = RetryGroupKey::new(
                        TestMethod::new("Bulk", format!("case{}", i)),
                        PolicyDescriptor::new("never"),
                    );
                    let policy = registry
                        .resolve_policy(&key, &context, || {
                            created.fetch_add(1, Ordering::SeqCst);
                            Ok(Arc::new(test_retry_interceptor::FnPolicy::new(
                                |_: &test_retry_core::TestOutcome| false,
                            )) as test_retry_interceptor::SharedPolicy)
                        })
                        .unwrap();
                    pointers.insert(Arc::as_ptr(&policy) as *const () as usize);
                }
                pointers
            })
        })
        .collect();

    let sets: Vec<HashSet<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(sets.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(created.load(Ordering::SeqCst), 50);
    assert_eq!(registry.policy_count(), 50);
}
