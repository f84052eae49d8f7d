//! Storage module.
//!
//! Record models, query filters, the [`DocumentStore`] seam and the
//! in-process [`MemoryStore`] backend.

pub mod memory;
pub mod models;
pub mod queries;
pub mod store;

pub use memory::*;
pub use models::*;
pub use queries::*;
pub use store::*;
