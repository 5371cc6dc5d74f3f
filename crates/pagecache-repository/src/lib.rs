//! # PageCache Repository
//!
//! Relational store access for the versioned pagination cache.
//!
//! ```text
//! ModelCache / BatchHydrator / SnapshotPaginator
//!   ↓  Arc<dyn EntityStore<T>>   (store interface)
//! TimedEntityStore<T>            (deadline per query)
//!   ↓
//! MySqlEntityStore<T>            (MySQL / SQLx)    or    MemoryEntityStore<T>
//! ```
//!
//! The store is authoritative. It answers four questions for the cache
//! layer: one row by id, many rows by id list, the full ordered id list for
//! a filtered listing, and idempotent create/partial update/delete.

pub mod memory;
pub mod mysql;
pub mod pool;
pub mod timed;
pub mod traits;

pub use memory::{MemoryEntityStore, StoreCalls};
pub use mysql::{MySqlEntityStore, SqlModel};
pub use pool::*;
pub use timed::TimedEntityStore;
pub use traits::*;
