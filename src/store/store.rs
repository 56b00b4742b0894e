use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// A callback invoked with the new state after every [`Store::set_state`].
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

// Listeners are keyed by the address of their allocation. A `Subscription`
// holds a strong reference, so the address cannot be reused while the
// registration can still be removed through it.
type ListenerKey = usize;

fn listener_key<T>(listener: &Listener<T>) -> ListenerKey {
    Arc::as_ptr(listener) as *const () as usize
}

/// Process-unique identifier of a store, used in logs and identity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(usize);

impl StoreId {
    fn next() -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store#{}", self.0)
    }
}

struct StoreInner<T> {
    id: StoreId,
    state: RwLock<Arc<T>>,
    listeners: RwLock<HashMap<ListenerKey, Listener<T>>>,
}

/// An observable state container.
///
/// The state is replaced wholesale by [`set_state`](Store::set_state), never
/// mutated in place, and every registered listener is notified synchronously
/// before `set_state` returns. The store performs no equality check: setting
/// a value equal to the current one still notifies.
///
/// Cloning a `Store` creates a new handle to the **same** state and
/// listener set.
///
/// # Examples
///
/// ```
/// use storehouse::Store;
///
/// let store = Store::new(1);
/// let _subscription = store.subscribe(|value| println!("now {value}"));
/// store.set_state(2);
/// assert_eq!(store.get_state(), 2);
/// ```
pub struct Store<T> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Store<T> {
    /// Create a new store with the given initial state.
    pub fn new(initial: T) -> Self {
        let id = StoreId::next();
        debug!(store = %id, "created store");
        Self {
            inner: Arc::new(StoreInner {
                id,
                state: RwLock::new(Arc::new(initial)),
                listeners: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Get a clone of the current state.
    pub fn get_state(&self) -> T {
        T::clone(&self.inner.state.read())
    }

    /// Get a shared, read-only view of the current state without cloning it.
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.inner.state.read())
    }

    /// Read state through a borrow.
    ///
    /// The state lock is held while `f` runs, so `f` must not call
    /// [`set_state`](Store::set_state) on the same store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let state = self.inner.state.read();
        f(&**state)
    }

    /// Replace the state and notify every registered listener with it.
    ///
    /// Listeners run after all locks are released against a snapshot of the
    /// listener set taken before the first call. A listener may therefore
    /// call `set_state` again, subscribe, or unsubscribe without affecting
    /// which listeners see this notification.
    ///
    /// Each listener is handed the state current at the moment it runs. That
    /// is `new_state` unless an earlier listener in the same pass replaced it,
    /// in which case later listeners see the newer value.
    pub fn set_state(&self, new_state: T) {
        // The old state is dropped after the write guard is released.
        let previous = std::mem::replace(&mut *self.inner.state.write(), Arc::new(new_state));
        drop(previous);

        let listeners: Vec<Listener<T>> = self.inner.listeners.read().values().cloned().collect();
        trace!(store = %self.inner.id, listeners = listeners.len(), "set_state");
        for listener in &listeners {
            let state = self.snapshot();
            listener(&state);
        }
    }

    /// Update the state using a function.
    ///
    /// The function edits a clone of the live state, which is then stored
    /// with [`set_state`](Store::set_state).
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut next = self.get_state();
        f(&mut next);
        self.set_state(next);
    }

    /// Subscribe to state changes.
    ///
    /// The callback will be called with the new state whenever the state is
    /// set. It stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_listener(Arc::new(callback))
    }

    /// Subscribe a shared listener.
    ///
    /// Registering the same `Arc` more than once keeps a single
    /// registration; every returned [`Subscription`] removes that one
    /// registration.
    pub fn subscribe_listener(&self, listener: Listener<T>) -> Subscription {
        let key = listener_key(&listener);
        {
            let mut listeners = self.inner.listeners.write();
            if listeners.contains_key(&key) {
                debug!(store = %self.inner.id, "listener already registered");
            } else {
                listeners.insert(key, Arc::clone(&listener));
                debug!(store = %self.inner.id, listeners = listeners.len(), "subscribed");
            }
        }

        let weak = Arc::downgrade(&self.inner);
        let remove = move || {
            let _held = listener;
            if let Some(inner) = weak.upgrade() {
                let mut listeners = inner.listeners.write();
                if listeners.remove(&key).is_some() {
                    debug!(store = %inner.id, listeners = listeners.len(), "unsubscribed");
                }
            }
        };

        Subscription {
            store: self.inner.id,
            remove: Mutex::new(Some(Box::new(remove))),
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl<T> Store<T> {
    /// The store's unique identifier.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Whether two handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.inner.id)
            .field("state", &**self.inner.state.read())
            .field("listeners", &self.inner.listeners.read().len())
            .finish()
    }
}

/// Create a store that is not registered under any namespace.
pub fn create_store<T>(initial: T) -> Store<T>
where
    T: Clone + Send + Sync + 'static,
{
    Store::new(initial)
}

/// Capability to remove one listener registration from a store.
///
/// Dropping the subscription unsubscribes. Calling
/// [`unsubscribe`](Subscription::unsubscribe) more than once is a no-op.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    store: StoreId,
    remove: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    /// Remove the listener. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        let remove = self.remove.lock().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Whether this subscription has not been unsubscribed or forgotten yet.
    pub fn is_active(&self) -> bool {
        self.remove.lock().is_some()
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn forget(self) {
        self.remove.lock().take();
    }

    /// The store this subscription belongs to.
    pub fn store_id(&self) -> StoreId {
        self.store
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("store", &self.store)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    struct AppState {
        count: usize,
        name: String,
    }

    fn app_state() -> AppState {
        AppState {
            count: 0,
            name: "test".to_string(),
        }
    }

    #[test]
    fn store_get_set() {
        let store = Store::new(app_state());

        assert_eq!(store.get_state().count, 0);

        store.set_state(AppState {
            count: 42,
            name: "updated".to_string(),
        });

        assert_eq!(store.get_state().count, 42);
        assert_eq!(store.get_state().name, "updated");
        assert_eq!(store.snapshot().count, 42);
    }

    #[test]
    fn store_update() {
        let store = Store::new(app_state());

        store.update(|state| {
            state.count += 10;
        });

        assert_eq!(store.get_state().count, 10);
        assert_eq!(store.read(|state| state.name.clone()), "test");
    }

    #[test]
    fn store_subscribe() {
        let store = Store::new(app_state());

        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let _subscription = store.subscribe(move |_state| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        store.update(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        store.update(|state| state.count += 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn equal_value_still_notifies() {
        let store = Store::new(7);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let _subscription = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.set_state(7);
        store.set_state(7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let store = Store::new(0);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_clone = first.clone();
        let sub_first = store.subscribe(move |_| {
            first_clone.fetch_add(1, Ordering::SeqCst);
        });
        let second_clone = second.clone();
        let _sub_second = store.subscribe(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(store.listener_count(), 2);

        sub_first.unsubscribe();
        assert!(!sub_first.is_active());
        sub_first.unsubscribe();
        assert_eq!(store.listener_count(), 1);

        store.set_state(1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = Store::new(0);
        {
            let _subscription = store.subscribe(|_| {});
            assert_eq!(store.listener_count(), 1);
        }
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn forgotten_subscription_stays_registered() {
        let store = Store::new(0);
        store.subscribe(|_| {}).forget();
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn duplicate_listener_collapses() {
        let store = Store::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let listener: Listener<i32> = Arc::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        let sub_a = store.subscribe_listener(listener.clone());
        let sub_b = store.subscribe_listener(listener);
        assert_eq!(store.listener_count(), 1);

        store.set_state(1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        sub_a.unsubscribe();
        assert_eq!(store.listener_count(), 0);
        sub_b.unsubscribe();
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn reentrant_set_state_delivers_each_value() {
        let store = Store::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = seen.clone();
        let store_clone = store.clone();
        store
            .subscribe(move |value: &i32| {
                seen_clone.lock().push(*value);
                if *value < 3 {
                    store_clone.set_state(value + 1);
                }
            })
            .forget();

        store.set_state(1);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
        assert_eq!(store.get_state(), 3);
    }

    #[test]
    fn unsubscribe_during_notification_does_not_skip() {
        let store = Store::new(0);
        let victim_calls = Arc::new(AtomicUsize::new(0));
        let victim_slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_calls_clone = victim_calls.clone();
        let victim = store.subscribe(move |_| {
            victim_calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        *victim_slot.lock() = Some(victim);

        let slot = victim_slot.clone();
        let _remover = store.subscribe(move |_| {
            let taken = slot.lock().take();
            if let Some(subscription) = taken {
                subscription.unsubscribe();
            }
        });

        store.set_state(1);
        assert_eq!(victim_calls.load(Ordering::SeqCst), 1);

        store.set_state(2);
        assert_eq!(victim_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn subscribe_during_notification_waits_for_next_pass() {
        let store = Store::new(0);
        let late_calls = Arc::new(AtomicUsize::new(0));
        let added: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let store_clone = store.clone();
        let late_calls_clone = late_calls.clone();
        let added_clone = added.clone();
        let _adder = store.subscribe(move |_| {
            let mut added = added_clone.lock();
            if added.is_empty() {
                let late_calls = late_calls_clone.clone();
                added.push(store_clone.subscribe(move |_| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                }));
            }
        });

        store.set_state(1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        store.set_state(2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);

        added.lock().clear();
    }

    #[test]
    fn old_state_drop_may_read_the_store() {
        #[derive(Clone)]
        struct Tracked {
            value: i32,
            peer: Arc<Mutex<Option<Store<Tracked>>>>,
        }

        impl Drop for Tracked {
            fn drop(&mut self) {
                let store = self.peer.lock().clone();
                if let Some(store) = store {
                    let _ = store.snapshot();
                }
            }
        }

        let peer = Arc::new(Mutex::new(None));
        let store = Store::new(Tracked {
            value: 0,
            peer: peer.clone(),
        });
        *peer.lock() = Some(store.clone());

        let (done, finished) = std::sync::mpsc::channel();
        let writer = store.clone();
        let next_peer = peer.clone();
        std::thread::spawn(move || {
            writer.set_state(Tracked {
                value: 1,
                peer: next_peer,
            });
            done.send(()).unwrap();
        });

        assert!(finished.recv_timeout(std::time::Duration::from_secs(3)).is_ok());
        assert_eq!(store.snapshot().value, 1);
        peer.lock().take();
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(1);
        let other = store.clone();
        other.set_state(5);
        assert_eq!(store.get_state(), 5);
        assert!(store.ptr_eq(&other));
        assert_eq!(store.id(), other.id());
        assert!(!store.ptr_eq(&create_store(5)));
    }
}
