//! # PageCache Domain
//!
//! Domain entities served through the versioned pagination cache.

pub mod entities;

pub use entities::*;
