// src/lib.rs

pub mod factory;
pub mod filter;
pub mod record;
pub mod store;
pub mod timestamp;

// Re-export commonly used types for convenience
pub use filter::{FieldKind, QueryFilter};
pub use record::{ServiceSpecification, BASE_PATH, RESOURCE_PATH};
pub use store::{MemoryStore, SpecStore, StoreError, SurrealStore};
