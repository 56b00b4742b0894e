use super::StoreRegistry;
use crate::binding::{Binding, Field};
use crate::error::Result;
use crate::store::Store;
use std::cell::RefCell;
use std::sync::{Arc, OnceLock};
use tracing::debug;

// Thread-local stack for scoped registries
thread_local! {
    static REGISTRY_STACK: RefCell<Vec<Arc<StoreRegistry>>> = const { RefCell::new(Vec::new()) };
}

impl StoreRegistry {
    /// Get the process-wide registry.
    ///
    /// This is the fallback used by [`current`](StoreRegistry::current) when
    /// no scoped registry is active. It lives for the rest of the process;
    /// call [`clear`](StoreRegistry::clear) to reset it.
    pub fn global() -> Arc<Self> {
        static REGISTRY: OnceLock<Arc<StoreRegistry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(|| Arc::new(Self::new())))
    }

    /// Get the current registry (scoped or global fallback).
    ///
    /// Returns the registry from the top of the thread-local stack,
    /// or the global registry if no scoped registry is active.
    pub fn current() -> Arc<Self> {
        REGISTRY_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::global)
    }

    /// Run a function with a fresh isolated registry as the current one.
    ///
    /// Every store registered inside `f` through the free functions is
    /// dropped from the registry when `f` returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use storehouse::{create_or_get_global_store, StoreRegistry};
    ///
    /// StoreRegistry::scope(|| {
    ///     let store = create_or_get_global_store("app", Some(0)).unwrap();
    ///     assert_eq!(store.get_state(), 0);
    /// });
    /// assert!(!StoreRegistry::current().contains("app"));
    /// ```
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_registry(Arc::new(Self::new()), f)
    }

    /// Run a function with a specific registry as the current context.
    ///
    /// This pushes the registry onto the thread-local stack for the duration
    /// of the function execution.
    pub fn with_registry<F, R>(registry: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        REGISTRY_STACK.with(|stack| stack.borrow_mut().push(registry));
        debug!("entered registry scope");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        REGISTRY_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
        debug!("left registry scope");

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }
}

/// Get or create the store for `namespace` in the current registry.
///
/// Safe to call repeatedly: every call with the same namespace returns the
/// same store, and `initial` is ignored once the namespace exists.
pub fn create_or_get_global_store<T>(namespace: &str, initial: Option<T>) -> Result<Store<T>>
where
    T: Clone + Send + Sync + 'static,
{
    StoreRegistry::current().get_or_create(namespace, initial)
}

/// Look up the store for `namespace` in the current registry.
pub fn global_store<T>(namespace: &str) -> Result<Store<T>>
where
    T: Clone + Send + Sync + 'static,
{
    StoreRegistry::current().lookup(namespace)
}

/// Bind one field of the store registered under `namespace` in the current
/// registry.
pub fn bind_global<T, V>(namespace: &str, field: Field<T, V>) -> Result<Binding<T, V>>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    StoreRegistry::current().bind(namespace, field)
}
