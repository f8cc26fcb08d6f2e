//! Order-by parsing and multi-key sorting
//!
//! Turns an untyped order-by string such as `"priority desc, name"` into an
//! ordered list of typed comparators drawn from a static per-entity
//! allow-list. Malformed input never errors: unknown fields are dropped and
//! an empty result falls back to the entity's default ordering.

use super::base::{Entity, Query};
use std::cmp::Ordering;
use std::fmt;

/// A sortable attribute of `T`
pub struct SortField<T> {
    /// Canonical field name
    pub name: &'static str,
    /// Additional names the field answers to
    pub aliases: &'static [&'static str],
    pub compare: fn(&T, &T) -> Ordering,
}

impl<T> fmt::Debug for SortField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortField")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl<T> SortField<T> {
    fn matches(&self, requested: &str) -> bool {
        std::iter::once(self.name)
            .chain(self.aliases.iter().copied())
            .any(|candidate| normalize(candidate) == requested)
    }
}

/// Lowercase and drop underscores so `start_date`, `StartDate` and
/// `startdate` compare equal.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// An entity with a fixed set of sortable fields
pub trait Sortable: Sized + 'static {
    fn sort_fields() -> &'static [SortField<Self>];

    /// Order-by string used when nothing usable was requested
    fn default_order_by() -> &'static str {
        "name"
    }

    /// Look up a field by name, case-insensitively and ignoring `_`.
    fn sort_field(name: &str) -> Option<&'static SortField<Self>> {
        let requested = normalize(name);
        Self::sort_fields()
            .iter()
            .find(|field| field.matches(&requested))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One key of a composite ordering
#[derive(Debug)]
pub struct SortKey<T: 'static> {
    pub field: &'static SortField<T>,
    pub direction: Direction,
}

/// A parsed, validated ordering for `T`
#[derive(Debug)]
pub struct OrderBy<T: 'static> {
    keys: Vec<SortKey<T>>,
}

impl<T: Sortable> OrderBy<T> {
    /// Parse an order-by string.
    ///
    /// Tokens are comma-separated; each is `field` or `field desc`. The
    /// field name is the text before the first space. Unknown fields are
    /// skipped. An input with no recognised field yields the entity's
    /// default ordering.
    pub fn parse(input: &str) -> Self {
        let keys = Self::parse_keys(input);
        if !keys.is_empty() {
            return Self { keys };
        }

        Self {
            keys: Self::parse_keys(T::default_order_by()),
        }
    }

    fn parse_keys(input: &str) -> Vec<SortKey<T>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter_map(|token| {
                let name = token.split(' ').next().unwrap_or(token);
                let field = T::sort_field(name)?;
                let direction = if token.to_lowercase().ends_with(" desc") {
                    Direction::Descending
                } else {
                    Direction::Ascending
                };
                Some(SortKey { field, direction })
            })
            .collect()
    }

    pub fn keys(&self) -> &[SortKey<T>] {
        &self.keys
    }

    /// Canonical field names with their directions, in key order
    pub fn describe(&self) -> Vec<(&'static str, Direction)> {
        self.keys
            .iter()
            .map(|key| (key.field.name, key.direction))
            .collect()
    }

    /// Compare two values key by key.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for key in &self.keys {
            let ordering = match key.direction {
                Direction::Ascending => (key.field.compare)(a, b),
                Direction::Descending => (key.field.compare)(b, a),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable sort: fully equal elements keep their relative order.
    pub fn apply(&self, items: &mut [T]) {
        items.sort_by(|a, b| self.compare(a, b));
    }
}

impl<'s, T: Entity + Sortable> Query<'s, T> {
    /// Order the fetched entities.
    pub fn sort(mut self, order_by: &OrderBy<T>) -> Self {
        order_by.apply(&mut self.items);
        self
    }
}
