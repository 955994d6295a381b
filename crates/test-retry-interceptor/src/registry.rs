//! Per-group policy singletons and attempt counters.
//!
//! The registry is an ordinary value: build one per process (or per test
//! case) and hand it to the interceptors that should share state. Every
//! operation touches exactly one key and locks only that key's shard, so
//! unrelated retry groups never wait on each other.

use crate::error::ResolutionError;
use crate::factory::PolicyDescriptor;
use crate::key::RetryGroupKey;
use crate::policy::SharedPolicy;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use test_retry_core::{TestContext, TestMethod};

/// Concurrent store of retry policy instances and attempt counters.
#[derive(Default)]
pub struct RetryRegistry {
    policies: DashMap<RetryGroupKey, SharedPolicy>,
    counters: DashMap<RetryGroupKey, AtomicUsize>,
    bindings: DashMap<(TestMethod, TestContext), PolicyDescriptor>,
}

impl RetryRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the policy instance of a group, creating it on first use.
    ///
    /// `factory` runs at most once per key, while the key's shard is locked:
    /// concurrent first callers all receive the single instance it produced.
    /// It must not call back into this registry. If it fails, the error is
    /// returned and nothing is stored.
    ///
    /// Within one `context`, a method keeps the policy it was first resolved
    /// with. Resolving it there again with a different policy fails with
    /// [`ResolutionError::PolicyChanged`]. Other contexts may resolve the
    /// same method to other policies; each one is its own retry group.
    pub fn resolve_policy<F>(
        &self,
        key: &RetryGroupKey,
        context: &TestContext,
        factory: F,
    ) -> Result<SharedPolicy, ResolutionError>
    where
        F: FnOnce() -> Result<SharedPolicy, ResolutionError>,
    {
        let scope = (key.method().clone(), context.clone());

        let bound = self.bindings.get(&scope).map(|entry| entry.value().clone());
        if let Some(bound) = bound {
            check_binding(key, &bound)?;
            let existing = self.policies.get(key).map(|entry| Arc::clone(entry.value()));
            if let Some(policy) = existing {
                return Ok(policy);
            }
        }

        // Lock order: policies shard, then bindings shard.
        match self.policies.entry(key.clone()) {
            Entry::Occupied(entry) => {
                match self.bindings.entry(scope) {
                    Entry::Occupied(bound) => check_binding(key, bound.get())?,
                    Entry::Vacant(binding) => {
                        binding.insert(key.policy().clone());
                    }
                }
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(slot) => match self.bindings.entry(scope) {
                Entry::Occupied(bound) => {
                    check_binding(key, bound.get())?;
                    let policy = factory()?;
                    slot.insert(Arc::clone(&policy));
                    Ok(policy)
                }
                Entry::Vacant(binding) => {
                    let policy = factory()?;
                    binding.insert(key.policy().clone());
                    slot.insert(Arc::clone(&policy));
                    Ok(policy)
                }
            },
        }
    }

    /// Atomically advances the group's attempt counter and returns the new
    /// value. The first call for a key returns 1.
    pub fn next_attempt_index(&self, key: &RetryGroupKey) -> usize {
        let prior = self
            .counters
            .get(key)
            .map(|counter| counter.fetch_add(1, Ordering::SeqCst));

        let prior = match prior {
            Some(prior) => prior,
            None => self
                .counters
                .entry(key.clone())
                .or_default()
                .fetch_add(1, Ordering::SeqCst),
        };
        prior + 1
    }

    /// Current value of the group's attempt counter, 0 if it never advanced.
    pub fn attempt_index(&self, key: &RetryGroupKey) -> usize {
        self.counters
            .get(key)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Returns `true` if a policy instance exists for the group.
    pub fn contains_policy(&self, key: &RetryGroupKey) -> bool {
        self.policies.contains_key(key)
    }

    /// Policy the method was first resolved with in `context`, if any.
    pub fn bound_policy(
        &self,
        method: &TestMethod,
        context: &TestContext,
    ) -> Option<PolicyDescriptor> {
        self.bindings
            .get(&(method.clone(), context.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Number of policy instances created so far.
    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    /// Number of groups whose attempt counter has advanced.
    pub fn group_count(&self) -> usize {
        self.counters.len()
    }

    /// Forgets every policy instance, counter and binding.
    pub fn reset(&self) {
        self.policies.clear();
        self.counters.clear();
        self.bindings.clear();
    }
}

fn check_binding(key: &RetryGroupKey, bound: &PolicyDescriptor) -> Result<(), ResolutionError> {
    if bound == key.policy() {
        return Ok(());
    }
    Err(ResolutionError::PolicyChanged {
        method: key.method().qualified_name(),
        bound: bound.clone(),
        requested: key.policy().clone(),
    })
}

impl fmt::Debug for RetryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRegistry")
            .field("policies", &self.policies.len())
            .field("counters", &self.counters.len())
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
