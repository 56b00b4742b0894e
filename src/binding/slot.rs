use super::{Binding, Field};
use crate::store::Store;
use std::fmt;
use tracing::debug;

/// A consumer-owned slot holding at most one [`Binding`].
///
/// Calling [`bind`](BindingSlot::bind) on every render keeps the existing
/// binding while the store and field stay the same. When either changes, the
/// old binding is detached and a new one is seeded from the new pair.
pub struct BindingSlot<T, V> {
    current: Option<Binding<T, V>>,
}

impl<T, V> BindingSlot<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an empty slot.
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Bind `field` of `store`, reusing the current binding if it matches.
    pub fn bind(&mut self, store: &Store<T>, field: Field<T, V>) -> &Binding<T, V> {
        let reusable = self
            .current
            .as_ref()
            .is_some_and(|binding| binding.store().ptr_eq(store) && binding.field().same_as(&field));

        if !reusable {
            if let Some(old) = self.current.take() {
                old.detach();
                debug!(
                    from_store = %old.store().id(),
                    from_field = old.field().name(),
                    to_store = %store.id(),
                    to_field = field.name(),
                    "rebinding slot"
                );
            }
        }

        self.current.get_or_insert_with(|| Binding::new(store, field))
    }

    /// The current binding, if any.
    pub fn current(&self) -> Option<&Binding<T, V>> {
        self.current.as_ref()
    }

    /// Detach and drop the current binding.
    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            old.detach();
        }
    }
}

impl<T, V> Default for BindingSlot<T, V>
where
    T: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V: fmt::Debug> fmt::Debug for BindingSlot<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSlot")
            .field("current", &self.current)
            .finish()
    }
}
