//! Fixtures shared by the unit tests.

use pagecache_core::Model;
use pagecache_repository::MemoryEntityStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
}

impl Note {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            owner_id: 1,
            title: title.to_string(),
        }
    }
}

impl Model for Note {
    const COLLECTION: &'static str = "note";
    const NATURAL_KEY: &'static [&'static str] = &["owner_id", "title"];

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// A store holding notes `1..=count`, titled `note {id}`.
pub fn seeded_store(count: i64) -> Arc<MemoryEntityStore<Note>> {
    let store = Arc::new(MemoryEntityStore::new());
    for id in 1..=count {
        store.insert(Note::new(id, &format!("note {}", id)));
    }
    store
}
