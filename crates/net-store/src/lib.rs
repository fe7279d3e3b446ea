//! l2net store
//!
//! Durable tables behind the binding store, the segmentation allocator and
//! the resource store.

pub mod bindings;
pub mod database;
pub mod resources;

pub use bindings::DbBindingStore;
pub use database::{Database, Tables};
pub use resources::DbResourceStore;
