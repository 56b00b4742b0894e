//! # Storehouse
//!
//! Observable state containers that independent consumers can share by name.
//!
//! Storehouse is built from three layers:
//!
//! ## Store
//!
//! - `Store<T>` - Owns one value, replaces it wholesale, and synchronously
//!   notifies every listener on each write
//! - `Subscription` - Idempotent capability that removes a listener again
//!
//! ## Registry
//!
//! - `StoreRegistry` - Maps namespaces to stores with get-or-create semantics
//! - Process-wide and thread-scoped registries for code that cannot pass one
//!   explicitly
//!
//! ## Bindings
//!
//! - `Binding<T, V>` - Per-consumer cache of one field, updated only when that
//!   field changes
//! - `FieldSetter<T, V>` - Merge-writes one field into the live state
//! - `BindingSlot<T, V>` - Rebinds when a consumer switches store or field
//!
//! ```
//! use storehouse::{field, StoreRegistry};
//!
//! #[derive(Clone)]
//! struct App {
//!     name: String,
//!     count: u32,
//! }
//!
//! let registry = StoreRegistry::new();
//! registry
//!     .create_or_get("app", App { name: "X".into(), count: 0 })
//!     .unwrap();
//!
//! let count = registry.bind("app", field!(App, count)).unwrap();
//! count.set(count.get() + 1);
//!
//! let store = registry.lookup::<App>("app").unwrap();
//! assert_eq!(store.get_state().count, 1);
//! ```

pub mod binding;
pub mod error;
pub mod registry;
pub mod store;

// Re-export main types for convenience
pub use binding::{bind, Binding, BindingSlot, Field, FieldSetter};
pub use error::{Result, StoreError};
pub use registry::{bind_global, create_or_get_global_store, global_store, StoreRegistry};
pub use store::{create_store, Listener, Store, StoreId, Subscription};
