//! # PageCache Core
//!
//! Core types, traits, and error definitions for the versioned pagination
//! cache. Every other crate in the workspace builds on the abstractions
//! defined here: the unified error taxonomy, the [`Model`] trait that cached
//! entities implement, listing query descriptions, and the page/snapshot
//! value types exchanged between the paginator and its callers.

pub mod error;
pub mod model;
pub mod pagination;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use model::*;
pub use pagination::*;
pub use result::*;
pub use telemetry::*;
