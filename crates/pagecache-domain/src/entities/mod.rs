//! Domain entities.

mod message_box;

pub use message_box::*;
