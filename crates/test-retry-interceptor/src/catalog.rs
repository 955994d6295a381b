//! A factory-map [`PolicyFactory`] built from named policy constructors.
//!
//! Assignments are resolved in precedence order: method, class, suite, then
//! the catalog default.

use crate::factory::{PolicyDescriptor, PolicyFactory};
use crate::policy::{RetryPolicy, SharedPolicy};
use hashbrown::HashMap;
use std::sync::Arc;
use test_retry_core::failure::BoxError;
use test_retry_core::{TestContext, TestMethod};

type PolicyConstructor = Arc<dyn Fn() -> Result<SharedPolicy, BoxError> + Send + Sync>;

/// The requested policy name has no registered constructor.
#[derive(Debug, thiserror::Error)]
#[error("unknown retry policy `{0}`")]
pub struct UnknownPolicy(pub PolicyDescriptor);

/// Immutable policy catalog.
///
/// # Examples
///
/// ```
/// use test_retry_interceptor::{FnPolicy, PolicyCatalog, PolicyFactory};
/// use test_retry_core::{TestContext, TestMethod, TestOutcome};
///
/// let catalog = PolicyCatalog::builder()
///     .register("never", || FnPolicy::new(|_: &TestOutcome| false))
///     .register("on-failure", || FnPolicy::new(|o: &TestOutcome| o.status().is_failure()))
///     .default_policy("never")
///     .assign_class("com.acme.PaymentTest", "on-failure")
///     .build();
///
/// let context = TestContext::new("nightly", "api");
/// let method = TestMethod::new("com.acme.PaymentTest", "refunds");
/// let descriptor = catalog.resolve_descriptor(&method, &context).unwrap();
/// assert_eq!(descriptor.as_str(), "on-failure");
/// ```
pub struct PolicyCatalog {
    constructors: HashMap<PolicyDescriptor, PolicyConstructor>,
    by_method: HashMap<TestMethod, PolicyDescriptor>,
    by_class: HashMap<String, PolicyDescriptor>,
    by_suite: HashMap<String, PolicyDescriptor>,
    default: Option<PolicyDescriptor>,
}

impl PolicyCatalog {
    /// Creates a new catalog builder.
    pub fn builder() -> PolicyCatalogBuilder {
        PolicyCatalogBuilder::new()
    }

    /// Returns `true` if a constructor is registered under the name.
    pub fn contains(&self, descriptor: &PolicyDescriptor) -> bool {
        self.constructors.contains_key(descriptor)
    }

    /// Number of registered constructors.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns `true` if no constructors are registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl PolicyFactory for PolicyCatalog {
    fn resolve_descriptor(
        &self,
        method: &TestMethod,
        context: &TestContext,
    ) -> Option<PolicyDescriptor> {
        self.by_method
            .get(method)
            .or_else(|| self.by_class.get(method.class_name()))
            .or_else(|| self.by_suite.get(context.suite_name()))
            .or(self.default.as_ref())
            .cloned()
    }

    fn instantiate(&self, descriptor: &PolicyDescriptor) -> Result<SharedPolicy, BoxError> {
        let constructor = self
            .constructors
            .get(descriptor)
            .ok_or_else(|| UnknownPolicy(descriptor.clone()))?;
        constructor()
    }
}

impl std::fmt::Debug for PolicyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut policies: Vec<_> = self.constructors.keys().map(|d| d.as_str()).collect();
        policies.sort_unstable();
        f.debug_struct("PolicyCatalog")
            .field("policies", &policies)
            .field("method_assignments", &self.by_method.len())
            .field("class_assignments", &self.by_class.len())
            .field("suite_assignments", &self.by_suite.len())
            .field("default", &self.default)
            .finish()
    }
}

/// Builder for [`PolicyCatalog`].
pub struct PolicyCatalogBuilder {
    constructors: HashMap<PolicyDescriptor, PolicyConstructor>,
    by_method: HashMap<TestMethod, PolicyDescriptor>,
    by_class: HashMap<String, PolicyDescriptor>,
    by_suite: HashMap<String, PolicyDescriptor>,
    default: Option<PolicyDescriptor>,
}

impl Default for PolicyCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyCatalogBuilder {
    /// Creates an empty builder. Without a default policy, methods with no
    /// assignment resolve to nothing.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            by_method: HashMap::new(),
            by_class: HashMap::new(),
            by_suite: HashMap::new(),
            default: None,
        }
    }

    /// Registers an infallible policy constructor under a name.
    ///
    /// Registering the same name twice keeps the last constructor.
    pub fn register<N, P, C>(self, name: N, constructor: C) -> Self
    where
        N: Into<PolicyDescriptor>,
        P: RetryPolicy + 'static,
        C: Fn() -> P + Send + Sync + 'static,
    {
        self.register_fallible(name, move || Ok(Arc::new(constructor()) as SharedPolicy))
    }

    /// Registers a constructor that may fail, e.g. because it reads external
    /// settings.
    pub fn register_fallible<N, C>(mut self, name: N, constructor: C) -> Self
    where
        N: Into<PolicyDescriptor>,
        C: Fn() -> Result<SharedPolicy, BoxError> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
        self
    }

    /// Assigns a policy to one test method. Highest precedence.
    pub fn assign_method<N>(mut self, method: TestMethod, name: N) -> Self
    where
        N: Into<PolicyDescriptor>,
    {
        self.by_method.insert(method, name.into());
        self
    }

    /// Assigns a policy to every method of a class.
    pub fn assign_class<C, N>(mut self, class_name: C, name: N) -> Self
    where
        C: Into<String>,
        N: Into<PolicyDescriptor>,
    {
        self.by_class.insert(class_name.into(), name.into());
        self
    }

    /// Assigns a policy to every method run in a suite.
    pub fn assign_suite<S, N>(mut self, suite_name: S, name: N) -> Self
    where
        S: Into<String>,
        N: Into<PolicyDescriptor>,
    {
        self.by_suite.insert(suite_name.into(), name.into());
        self
    }

    /// Sets the policy used when no assignment matches.
    pub fn default_policy<N>(mut self, name: N) -> Self
    where
        N: Into<PolicyDescriptor>,
    {
        self.default = Some(name.into());
        self
    }

    /// Builds the catalog.
    ///
    /// Assignments to names without a registered constructor are kept; they
    /// fail at instantiation time with [`UnknownPolicy`].
    pub fn build(self) -> PolicyCatalog {
        PolicyCatalog {
            constructors: self.constructors,
            by_method: self.by_method,
            by_class: self.by_class,
            by_suite: self.by_suite,
            default: self.default,
        }
    }
}
