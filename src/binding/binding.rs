use super::Field;
use crate::store::{Store, Subscription};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type ChangeCallback<V> = Arc<dyn Fn(&V) + Send + Sync>;

struct BindingInner<V> {
    field: &'static str,
    cached: RwLock<Arc<V>>,
    attached: AtomicBool,
    version: AtomicU64,
    derivations: AtomicU64,
    on_change: RwLock<Option<ChangeCallback<V>>>,
}

// Values that are not equal to themselves (NaN) count as unchanged when both
// sides are such values.
#[allow(clippy::eq_op)]
fn same_value<V: PartialEq>(cached: &V, value: &V) -> bool {
    cached == value || (cached != cached && value != value)
}

impl<V: Clone + PartialEq> BindingInner<V> {
    fn observe(&self, value: &V) {
        // A notification pass may still reach a binding detached earlier in
        // the same pass.
        if !self.attached.load(Ordering::SeqCst) {
            return;
        }
        self.derivations.fetch_add(1, Ordering::SeqCst);

        {
            let mut cached = self.cached.write();
            if same_value(&**cached, value) {
                return;
            }
            *cached = Arc::new(value.clone());
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(field = self.field, version, "binding changed");

        let on_change = self.on_change.read().clone();
        if let Some(on_change) = on_change {
            on_change(value);
        }
    }
}

/// A per-consumer view of one field of a [`Store`].
///
/// The binding keeps a cached copy of the field. It inspects every state
/// the store publishes while attached, but only updates the cache, bumps
/// its [`version`](Binding::version) and calls its change callback when the
/// field's value actually differs from the cached one.
///
/// Writes go through [`set`](Binding::set), which merges the new field value
/// into the store's live state.
///
/// Dropping a binding detaches it.
///
/// # Examples
///
/// ```
/// use storehouse::{bind, field, Store};
///
/// #[derive(Clone)]
/// struct State {
///     name: String,
///     count: u32,
/// }
///
/// let store = Store::new(State { name: "X".into(), count: 0 });
/// let count = bind(&store, field!(State, count));
/// let name = bind(&store, field!(State, name));
///
/// count.set(count.get() + 1);
///
/// assert_eq!(count.get(), 1);
/// assert_eq!(count.version(), 1);
/// assert_eq!(name.version(), 0);
/// ```
pub struct Binding<T, V> {
    store: Store<T>,
    field: Field<T, V>,
    inner: Arc<BindingInner<V>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T, V> Binding<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an attached binding, seeded from the store's current state.
    pub fn new(store: &Store<T>, field: Field<T, V>) -> Self {
        let seed = store.read(|state| field.get(state).clone());
        let binding = Self {
            store: store.clone(),
            field,
            inner: Arc::new(BindingInner {
                field: field.name(),
                cached: RwLock::new(Arc::new(seed)),
                attached: AtomicBool::new(false),
                version: AtomicU64::new(0),
                derivations: AtomicU64::new(0),
                on_change: RwLock::new(None),
            }),
            subscription: Mutex::new(None),
        };
        binding.attach();
        binding
    }

    /// Subscribe to the store if not already subscribed.
    ///
    /// Re-attaching reseeds the cached value from the live state without
    /// emitting a change.
    pub fn attach(&self) {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let field = self.field;
        *subscription = Some(self.store.subscribe(move |state: &T| {
            if let Some(inner) = weak.upgrade() {
                inner.observe(field.get(state));
            }
        }));

        let seed = self.store.read(|state| field.get(state).clone());
        *self.inner.cached.write() = Arc::new(seed);
        self.inner.attached.store(true, Ordering::SeqCst);
        debug!(store = %self.store.id(), field = field.name(), "binding attached");
    }

    /// Drop the store subscription.
    ///
    /// Returns whether the binding was attached; detaching twice is a no-op.
    pub fn detach(&self) -> bool {
        self.inner.attached.store(false, Ordering::SeqCst);
        let subscription = self.subscription.lock().take();
        match subscription {
            Some(subscription) => {
                subscription.unsubscribe();
                debug!(store = %self.store.id(), field = self.field.name(), "binding detached");
                true
            }
            None => false,
        }
    }

    /// Whether the binding is currently subscribed to its store.
    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::SeqCst)
    }

    /// Get a clone of the cached field value.
    pub fn get(&self) -> V {
        V::clone(&self.inner.cached.read())
    }

    /// Read the cached field value without cloning it.
    ///
    /// `f` runs with no lock held, so it may write through this binding.
    pub fn with<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        let cached = Arc::clone(&self.inner.cached.read());
        f(&cached)
    }

    /// Write the field into the store's live state.
    ///
    /// See [`FieldSetter::set`].
    pub fn set(&self, value: V) {
        self.setter().set(value);
    }

    /// A detached write handle for this binding's field.
    pub fn setter(&self) -> FieldSetter<T, V> {
        FieldSetter {
            store: self.store.clone(),
            field: self.field,
        }
    }

    /// The cached value together with a setter.
    pub fn split(&self) -> (V, FieldSetter<T, V>) {
        (self.get(), self.setter())
    }

    /// Register the callback run whenever the field's value changes.
    ///
    /// Replaces any previously registered callback. The callback runs
    /// synchronously inside the store's notification pass.
    pub fn on_change<F>(&self, callback: F)
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        *self.inner.on_change.write() = Some(Arc::new(callback));
    }

    /// Number of changes emitted since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Number of store notifications inspected since creation.
    pub fn derivations(&self) -> u64 {
        self.inner.derivations.load(Ordering::SeqCst)
    }
}

impl<T, V> Binding<T, V> {
    /// The backing store.
    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// The bound field.
    pub fn field(&self) -> Field<T, V> {
        self.field
    }
}

impl<T, V> Drop for Binding<T, V> {
    fn drop(&mut self) {
        self.inner.attached.store(false, Ordering::SeqCst);
        // Dropping the subscription unsubscribes.
        self.subscription.get_mut().take();
    }
}

impl<T, V: fmt::Debug> fmt::Debug for Binding<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("store", &self.store.id())
            .field("field", &self.field.name())
            .field("cached", &**self.inner.cached.read())
            .field("version", &self.inner.version.load(Ordering::SeqCst))
            .finish()
    }
}

/// Write handle for one field of a store.
///
/// Every write is a read-modify-write against the store's state at call
/// time, not against any earlier snapshot. Two writes are not atomic
/// together: other writers may interleave between them, and a value
/// computed from an old read overwrites whatever the field holds now.
pub struct FieldSetter<T, V> {
    store: Store<T>,
    field: Field<T, V>,
}

impl<T, V> FieldSetter<T, V>
where
    T: Clone + Send + Sync + 'static,
{
    /// Merge `value` into the live state and publish the result.
    pub fn set(&self, value: V) {
        let field = self.field;
        self.store.update(move |state| field.set(state, value));
    }
}

impl<T, V> Clone for FieldSetter<T, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            field: self.field,
        }
    }
}

impl<T, V> fmt::Debug for FieldSetter<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSetter")
            .field("store", &self.store.id())
            .field("field", &self.field.name())
            .finish()
    }
}

/// Bind one field of a store.
pub fn bind<T, V>(store: &Store<T>, field: Field<T, V>) -> Binding<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    Binding::new(store, field)
}
