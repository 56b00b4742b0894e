//! Field-level bindings.
//!
//! This module narrows a store's whole-state notifications down to one field
//! per consumer:
//! - [`Field`]: names and accesses one field of a state type
//! - [`Binding`]: cached field value kept in sync with a store
//! - [`FieldSetter`]: merge-writes one field back into the store
//! - [`BindingSlot`]: a consumer's slot that rebinds when its store or field changes

mod binding;
mod field;
mod slot;

pub use binding::{bind, Binding, FieldSetter};
pub use field::Field;
pub use slot::BindingSlot;
