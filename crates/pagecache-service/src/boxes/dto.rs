//! Requests accepted by [`BoxListingService`](super::BoxListingService).

use crate::validation::{not_blank, ValidateExt};
use pagecache_core::{PageCacheError, PageCacheResult, PageRequest};
use pagecache_domain::MessageBox;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Order used when a listing request names none.
pub const DEFAULT_ORDER: &str = "updated_at desc";

/// One page of the box listing, optionally narrowed to one owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoxListRequest {
    #[serde(flatten)]
    pub page: PageRequest,

    /// Owner to list boxes of. `None` or `0` lists every box.
    #[serde(default)]
    pub owner: Option<i64>,

    /// One of [`MessageBox::ORDERS`]; defaults to [`DEFAULT_ORDER`].
    #[serde(default)]
    pub order_by: Option<String>,
}

impl BoxListRequest {
    /// Lists every box in the default order.
    #[must_use]
    pub fn new(page: PageRequest) -> Self {
        Self {
            page,
            owner: None,
            order_by: None,
        }
    }

    /// Narrows the listing to `owner`.
    #[must_use]
    pub fn owned_by(mut self, owner: i64) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the order clause.
    #[must_use]
    pub fn ordered_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// The owner scope, with `0` meaning none.
    #[must_use]
    pub fn owner_scope(&self) -> Option<i64> {
        self.owner.filter(|owner| *owner != 0)
    }

    /// The normalised order clause.
    ///
    /// Fails with [`PageCacheError::Validation`] for orders boxes are not
    /// listed in.
    pub fn order(&self) -> PageCacheResult<&'static str> {
        let requested = self
            .order_by
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or(DEFAULT_ORDER);
        MessageBox::ORDERS
            .iter()
            .copied()
            .find(|known| known.eq_ignore_ascii_case(requested))
            .ok_or_else(|| {
                PageCacheError::validation(format!(
                    "order_by must be one of: {}",
                    MessageBox::ORDERS.join(", ")
                ))
            })
    }

    /// Checks the page bounds, owner and order.
    pub fn validate(&self) -> PageCacheResult<()> {
        self.page.validate()?;
        if matches!(self.owner, Some(owner) if owner < 0) {
            return Err(PageCacheError::validation("owner must not be negative"));
        }
        self.order().map(|_| ())
    }
}

/// Body of a box creation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BoxCreateRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub title: String,
}

impl BoxCreateRequest {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }

    pub(crate) fn checked(&self) -> PageCacheResult<&str> {
        self.validate_request()?;
        Ok(self.title.trim())
    }
}

/// Body of a box modification. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BoxModifyRequest {
    #[validate(length(min = 1, max = 64), custom(function = "not_blank"))]
    pub title: Option<String>,
}

impl BoxModifyRequest {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }

    /// Returns true if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
    }

    pub(crate) fn checked(&self) -> PageCacheResult<()> {
        if self.is_empty() {
            return Err(PageCacheError::validation("no field to modify"));
        }
        self.validate_request()
    }
}
