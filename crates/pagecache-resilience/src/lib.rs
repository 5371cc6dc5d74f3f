//! # PageCache Resilience
//!
//! Call deadlines for cache and store operations. Every external call is
//! bounded; an elapsed deadline surfaces as a transient backend error and is
//! never confused with a cache miss. No retries or circuit breaking happen
//! here: failures propagate to the calling handler unchanged.

pub mod timeout;

pub use timeout::*;
