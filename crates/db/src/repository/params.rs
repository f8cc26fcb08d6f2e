//! Listing parameters for project and task queries
//!
//! These carry the untyped order-by string and the range bounds a caller
//! supplies. They deserialize with defaults so an outer layer can bind them
//! straight from a query string or config document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordering and priority bounds shared by every listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestParameters {
    /// Comma-separated order-by tokens, e.g. `"priority desc,name"`
    pub order_by: String,
    pub min_priority: u32,
    pub max_priority: u32,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            order_by: String::new(),
            min_priority: 0,
            max_priority: u32::MAX,
        }
    }
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `min_priority <= max_priority`.
    ///
    /// Listing never enforces this; an inverted range yields no results.
    pub fn is_valid_priority_range(&self) -> bool {
        self.min_priority <= self.max_priority
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    pub fn with_priority_range(mut self, min: u32, max: u32) -> Self {
        self.min_priority = min;
        self.max_priority = max;
        self
    }
}

/// Parameters for task listings
pub type TaskParameters = RequestParameters;

/// Parameters for project listings
///
/// Adds start-date bounds (defaulting to the widest representable range)
/// and optional completion-date bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectParameters {
    #[serde(flatten)]
    pub base: RequestParameters,
    pub min_start_date: DateTime<Utc>,
    pub max_start_date: DateTime<Utc>,
    pub min_completion_date: Option<DateTime<Utc>>,
    pub max_completion_date: Option<DateTime<Utc>>,
}

impl Default for ProjectParameters {
    fn default() -> Self {
        Self {
            base: RequestParameters::new().with_order_by("name"),
            min_start_date: DateTime::<Utc>::MIN_UTC,
            max_start_date: DateTime::<Utc>::MAX_UTC,
            min_completion_date: None,
            max_completion_date: None,
        }
    }
}

impl ProjectParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_priority_range(&self) -> bool {
        self.base.is_valid_priority_range()
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.base.order_by = order_by.into();
        self
    }

    pub fn with_priority_range(mut self, min: u32, max: u32) -> Self {
        self.base = self.base.with_priority_range(min, max);
        self
    }

    pub fn with_start_range(mut self, min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        self.min_start_date = min;
        self.max_start_date = max;
        self
    }

    pub fn with_completion_range(
        mut self,
        min: Option<DateTime<Utc>>,
        max: Option<DateTime<Utc>>,
    ) -> Self {
        self.min_completion_date = min;
        self.max_completion_date = max;
        self
    }
}
