//! Observable state containers.
//!
//! A [`Store`] owns one value, replaces it wholesale on every write, and
//! synchronously notifies its listeners. [`Subscription`]s are the
//! capabilities that remove a listener again.

mod store;

pub use store::{create_store, Listener, Store, StoreId, Subscription};
