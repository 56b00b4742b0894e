use crate::binding::{bind, Binding, Field};
use crate::error::{Result, StoreError};
use crate::store::Store;
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

type ErasedStore = Box<dyn Any + Send + Sync>;

fn downcast<T>(namespace: &str, erased: &ErasedStore) -> Result<Store<T>>
where
    T: Clone + Send + Sync + 'static,
{
    erased
        .downcast_ref::<Store<T>>()
        .cloned()
        .ok_or_else(|| StoreError::TypeMismatch {
            namespace: namespace.to_owned(),
            expected: type_name::<T>(),
        })
}

/// A mapping from namespace to store with get-or-create semantics.
///
/// Once a namespace is populated it keeps the same store until it is
/// [`remove`](StoreRegistry::remove)d or the registry is
/// [`clear`](StoreRegistry::clear)ed; later creation requests return the
/// existing store and ignore their initial state.
///
/// A registry is an ordinary value. Pass one explicitly, or use the
/// process-wide and scoped instances via [`StoreRegistry::current`].
///
/// # Examples
///
/// ```
/// use storehouse::StoreRegistry;
///
/// let registry = StoreRegistry::new();
/// let first = registry.get_or_create("counter", Some(1)).unwrap();
/// let second = registry.get_or_create("counter", Some(99)).unwrap();
///
/// assert!(first.ptr_eq(&second));
/// assert_eq!(second.get_state(), 1);
/// ```
pub struct StoreRegistry {
    stores: RwLock<HashMap<String, ErasedStore>>,
}

impl StoreRegistry {
    /// Create an empty, isolated registry.
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Return the store under `namespace`, creating it from `initial` if the
    /// namespace is empty.
    ///
    /// Fails with [`StoreError::MissingInitialState`] when the namespace is
    /// empty and no initial state was supplied.
    pub fn get_or_create<T>(&self, namespace: &str, initial: Option<T>) -> Result<Store<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.resolve(namespace, || {
            initial.ok_or_else(|| StoreError::MissingInitialState {
                namespace: namespace.to_owned(),
            })
        })
    }

    /// Return the store under `namespace`, creating it from `initial` if the
    /// namespace is empty.
    pub fn create_or_get<T>(&self, namespace: &str, initial: T) -> Result<Store<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.resolve(namespace, || Ok(initial))
    }

    /// Like [`create_or_get`](StoreRegistry::create_or_get), but the initial
    /// state is only computed when the namespace is empty.
    pub fn get_or_create_with<T, F>(&self, namespace: &str, init: F) -> Result<Store<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        self.resolve(namespace, || Ok(init()))
    }

    /// Look up an existing store without creating one.
    pub fn lookup<T>(&self, namespace: &str) -> Result<Store<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let stores = self.stores.read();
        match stores.get(namespace) {
            Some(erased) => downcast(namespace, erased),
            None => Err(StoreError::StoreNotFound {
                namespace: namespace.to_owned(),
            }),
        }
    }

    /// Look up the store under `namespace` and bind one of its fields.
    pub fn bind<T, V>(&self, namespace: &str, field: Field<T, V>) -> Result<Binding<T, V>>
    where
        T: Clone + Send + Sync + 'static,
        V: Clone + PartialEq + Send + Sync + 'static,
    {
        let store = self.lookup::<T>(namespace)?;
        Ok(bind(&store, field))
    }

    /// Whether a store is registered under `namespace`.
    pub fn contains(&self, namespace: &str) -> bool {
        self.stores.read().contains_key(namespace)
    }

    /// All registered namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.stores.read().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    /// Number of registered stores.
    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    /// Whether no store is registered.
    pub fn is_empty(&self) -> bool {
        self.stores.read().is_empty()
    }

    /// Unregister the store under `namespace`.
    ///
    /// Existing handles keep working; the next creation request for the
    /// namespace allocates a fresh store.
    pub fn remove(&self, namespace: &str) -> bool {
        let removed = self.stores.write().remove(namespace).is_some();
        if removed {
            debug!(namespace, "removed store");
        }
        removed
    }

    /// Unregister every store. Intended for test teardown.
    pub fn clear(&self) {
        let mut stores = self.stores.write();
        debug!(stores = stores.len(), "cleared registry");
        stores.clear();
    }

    // The initializer runs without the lock held, so it may itself use the
    // registry. If another caller fills the namespace meanwhile, that store
    // wins and the computed state is discarded.
    fn resolve<T, F>(&self, namespace: &str, init: F) -> Result<Store<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        if let Some(erased) = self.stores.read().get(namespace) {
            let store = downcast(namespace, erased)?;
            debug!(namespace, store = %store.id(), "registry hit");
            return Ok(store);
        }

        let initial = init()?;
        let mut stores = self.stores.write();
        match stores.entry(namespace.to_owned()) {
            Entry::Occupied(entry) => downcast(namespace, entry.get()),
            Entry::Vacant(entry) => {
                let store = Store::new(initial);
                debug!(namespace, store = %store.id(), "registered store");
                entry.insert(Box::new(store.clone()));
                Ok(store)
            }
        }
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
