//! # PageCache Service
//!
//! Cache-aside access to entities and versioned, snapshot-backed pagination
//! of their listings.
//!
//! ```text
//! BoxListingService
//!   ├─ ModelCache<T>          one entity: {collection}:{id}
//!   └─ SnapshotPaginator<T>   listings: {list_key}:{version}, {list_key}:latest
//!        └─ BatchHydrator<T>  pages of ids -> entities
//!   ↓  Arc<dyn KvCache>        Arc<dyn EntityStore<T>>
//! ```

pub mod boxes;
pub mod cache;
pub mod coalesce;
pub mod di;
pub mod hydrator;
pub mod model_cache;
pub mod paginator;
pub mod policy;
pub mod validation;

#[cfg(test)]
mod testing;

pub use boxes::{BoxCreateRequest, BoxListRequest, BoxListingService, BoxModifyRequest};
pub use cache::*;
pub use coalesce::KeyedLock;
pub use di::{build_cache, Backends};
pub use hydrator::{BatchHydrator, Hydrated};
pub use model_cache::ModelCache;
pub use paginator::SnapshotPaginator;
pub use policy::CachePolicy;
pub use validation::ValidateExt;
