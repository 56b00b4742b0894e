//! Namespace registry for shared stores.
//!
//! This module turns a [`Store`](crate::Store) into a singleton reachable by
//! name, so independent consumers can rendezvous on the same state without
//! passing the store around.

mod context;
mod registry;

pub use context::{bind_global, create_or_get_global_store, global_store};
pub use registry::StoreRegistry;
