//! MySQL implementations.

mod entity_store;
mod message_box;
mod sql_model;

pub use entity_store::MySqlEntityStore;
pub use sql_model::SqlModel;
