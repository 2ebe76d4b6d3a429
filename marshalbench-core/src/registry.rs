// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Static test registry and discovery.
//!
//! A test holder lists its strategy methods once, in declaration order, through
//! [`TestRegistry`]. Discovery keeps every method whose name starts with
//! [`TEST_PREFIX`], strips the prefix, and wraps the method into a
//! [`TestDescriptor`] that the runner can invoke without knowing the holder type.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::error::{BenchError, BenchResult, BoundaryFault, HardValidationError};
use crate::types::{Category, IterationCount, TestName};

/// Name prefix marking a holder method as a benchmark.
pub const TEST_PREFIX: &str = "test_";

/// A strategy method: performs one unit of work and returns its iteration count.
pub type TestMethod<H> = fn(&mut H) -> Result<u64, BoundaryFault>;

/// Ordered list of named methods on a holder type.
pub struct TestRegistry<H> {
    methods: Vec<(&'static str, TestMethod<H>)>,
}

impl<H> TestRegistry<H> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// Append a method. Registration order is discovery order.
    pub fn method(mut self, name: &'static str, method: TestMethod<H>) -> Self {
        self.methods.push((name, method));
        self
    }

    /// Registered method names, in order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|(name, _)| *name)
    }

    /// Get the number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<H> Default for TestRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a [`TestRegistry`] from method paths, using each method's own
/// identifier as its registered name.
///
/// ```ignore
/// fn registry() -> TestRegistry<Self> {
///     test_methods!(Self => test_empty_function, test_get_name)
/// }
/// ```
#[macro_export]
macro_rules! test_methods {
    ($holder:ty => $($method:ident),* $(,)?) => {
        $crate::registry::TestRegistry::<$holder>::new()
            $(.method(stringify!($method), <$holder>::$method))*
    };
}

/// Anything that exposes prefixed, count-returning strategy methods.
pub trait TestHolder: Sized + 'static {
    /// The holder's methods in declaration order.
    fn registry() -> TestRegistry<Self>;
}

type InvokeFn = Box<dyn FnMut() -> Result<u64, BoundaryFault>>;

/// One discovered benchmark.
pub struct TestDescriptor {
    name: TestName,
    category: Option<Category>,
    is_primary: bool,
    invoke: InvokeFn,
}

impl TestDescriptor {
    /// Wrap an arbitrary closure as a descriptor with no category.
    pub fn new(
        name: TestName,
        invoke: impl FnMut() -> Result<u64, BoundaryFault> + 'static,
    ) -> Self {
        Self {
            name,
            category: None,
            is_primary: false,
            invoke: Box::new(invoke),
        }
    }

    /// Get the test name.
    pub fn name(&self) -> &TestName {
        &self.name
    }

    /// Get the category label, if the producing catalog assigned one.
    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    /// Whether the descriptor belongs to the always-shown tier.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Run one unit of work.
    ///
    /// Fails with `InvalidTestResult` on a zero count and with
    /// `BoundaryInvocation` when the native side reports a fault.
    pub fn invoke(&mut self) -> BenchResult<IterationCount> {
        let returned = (self.invoke)().map_err(|source| BenchError::BoundaryInvocation {
            test: self.name.to_string(),
            source,
        })?;

        IterationCount::new(returned).ok_or_else(|| BenchError::InvalidTestResult {
            name: self.name.to_string(),
            returned,
        })
    }
}

impl fmt::Debug for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDescriptor")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("is_primary", &self.is_primary)
            .finish_non_exhaustive()
    }
}

/// An ordered list of descriptors produced by one or more discoveries.
#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: Vec<TestDescriptor>,
}

impl Catalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the category of every descriptor in this catalog.
    pub fn with_category(mut self, category: Category) -> Self {
        for descriptor in &mut self.descriptors {
            descriptor.category = Some(category.clone());
        }
        self
    }

    /// Move every descriptor in this catalog into the primary tier.
    pub fn into_primary(mut self) -> Self {
        for descriptor in &mut self.descriptors {
            descriptor.is_primary = true;
        }
        self
    }

    /// Append another catalog, keeping both orders.
    pub fn append(&mut self, mut other: Catalog) {
        self.descriptors.append(&mut other.descriptors);
    }

    /// Append a single descriptor.
    pub fn push(&mut self, descriptor: TestDescriptor) {
        self.descriptors.push(descriptor);
    }

    /// Iterate descriptors in order.
    pub fn iter(&self) -> impl Iterator<Item = &TestDescriptor> {
        self.descriptors.iter()
    }

    /// Get the number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Take the descriptors out of the catalog.
    pub fn into_descriptors(self) -> Vec<TestDescriptor> {
        self.descriptors
    }
}

/// Discover the prefixed methods of `holder` using its own registry.
pub fn discover<H: TestHolder>(holder: H) -> BenchResult<Catalog> {
    discover_with(holder, H::registry())
}

/// Discover the prefixed methods of `holder` listed in `registry`.
///
/// All descriptors share the one holder instance, so per-holder state such as
/// anti-elimination sinks accumulates across tests of the same family.
pub fn discover_with<H: 'static>(holder: H, registry: TestRegistry<H>) -> BenchResult<Catalog> {
    let holder = Rc::new(RefCell::new(holder));
    let mut seen = HashSet::new();
    let mut catalog = Catalog::new();

    for (method_name, method) in registry.methods {
        let Some(stripped) = method_name.strip_prefix(TEST_PREFIX) else {
            tracing::trace!(method = method_name, "Skipping non-test method");
            continue;
        };

        let name = TestName::new(stripped)?;
        if !seen.insert(name.clone()) {
            return Err(HardValidationError::DuplicateTestName {
                name: name.to_string(),
            }
            .into());
        }

        let holder = Rc::clone(&holder);
        catalog.push(TestDescriptor::new(name, move || {
            method(&mut *holder.borrow_mut())
        }));
    }

    tracing::debug!(
        holder = std::any::type_name::<H>(),
        tests = catalog.len(),
        "Discovered tests"
    );

    Ok(catalog)
}

/// Re-tag a catalog with a raw category label.
pub fn retag(catalog: Catalog, label: impl Into<String>) -> BenchResult<Catalog> {
    Ok(catalog.with_category(Category::new(label)?))
}
