//! Cache key derivation.
//!
//! ```text
//! {collection}:{id}          entity replica
//! {list_key}:{version}       frozen id array of one snapshot
//! {list_key}:latest          pointer to the newest snapshot
//! ```

use std::fmt::{self, Display};

/// Suffix of the latest-snapshot pointer.
pub const LATEST: &str = "latest";

/// Key of one entity's cached replica.
#[must_use]
pub fn entity(collection: &str, id: i64) -> String {
    format!("{}:{}", collection, id)
}

/// Key of a versioned snapshot.
#[must_use]
pub fn snapshot(list_key: &str, version: i64) -> String {
    format!("{}:{}", list_key, version)
}

/// Key of a listing's latest-snapshot pointer.
#[must_use]
pub fn latest(list_key: &str) -> String {
    format!("{}:{}", list_key, LATEST)
}

/// Builder for listing keys of the form `{name}[:{scope}...]:{order}`.
///
/// Spaces in the order clause become `_`, so `"updated_at desc"` scoped to
/// owner 3 yields `boxes:3:updated_at_desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKey {
    name: String,
    scopes: Vec<String>,
    order: Option<String>,
}

impl ListKey {
    /// Starts a key for the listing `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scopes: Vec::new(),
            order: None,
        }
    }

    /// Narrows the listing, e.g. to one owner.
    #[must_use]
    pub fn scope(mut self, scope: impl Display) -> Self {
        self.scopes.push(scope.to_string());
        self
    }

    /// Narrows the listing when `scope` is present.
    #[must_use]
    pub fn scope_opt<S: Display>(self, scope: Option<S>) -> Self {
        match scope {
            Some(s) => self.scope(s),
            None => self,
        }
    }

    /// Sets the order clause.
    #[must_use]
    pub fn order(mut self, clause: &str) -> Self {
        self.order = Some(clause.trim().replace(' ', "_"));
        self
    }

    /// Key of this listing's latest-snapshot pointer.
    #[must_use]
    pub fn latest(&self) -> String {
        latest(&self.to_string())
    }
}

impl Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for scope in &self.scopes {
            write!(f, ":{}", scope)?;
        }
        if let Some(order) = &self.order {
            write!(f, ":{}", order)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key() {
        assert_eq!(entity("box", 7), "box:7");
    }

    #[test]
    fn test_snapshot_and_latest_keys() {
        assert_eq!(snapshot("boxes:id_asc", 1_700_000), "boxes:id_asc:1700000");
        assert_eq!(latest("boxes:id_asc"), "boxes:id_asc:latest");
    }

    #[test]
    fn test_list_key_builder() {
        let key = ListKey::new("boxes").scope(3).order("updated_at desc");
        assert_eq!(key.to_string(), "boxes:3:updated_at_desc");
        assert_eq!(key.latest(), "boxes:3:updated_at_desc:latest");

        let unscoped = ListKey::new("boxes").scope_opt(None::<i64>).order("id asc");
        assert_eq!(unscoped.to_string(), "boxes:id_asc");

        assert_eq!(ListKey::new("users").to_string(), "users");
    }
}
