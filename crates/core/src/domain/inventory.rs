use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Stock level of a single `(category, item)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAvailability", into = "RawAvailability")]
pub enum Availability {
    /// Seeded as `true`. Never decremented.
    AlwaysInStock,
    /// Seeded as `false`.
    Unavailable,
    Remaining(u32),
}

impl Availability {
    pub fn covers(&self, requested: u32) -> bool {
        match self {
            Self::AlwaysInStock => true,
            Self::Unavailable => false,
            Self::Remaining(remaining) => *remaining >= requested,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawAvailability {
    Flag(bool),
    Count(i64),
    Fractional(f64),
}

impl From<RawAvailability> for Availability {
    fn from(value: RawAvailability) -> Self {
        match value {
            RawAvailability::Flag(true) => Self::AlwaysInStock,
            RawAvailability::Flag(false) => Self::Unavailable,
            RawAvailability::Count(count) => Self::Remaining(clamp_count(count)),
            RawAvailability::Fractional(count) if count.is_finite() => {
                Self::Remaining(clamp_count(count.floor() as i64))
            }
            RawAvailability::Fractional(_) => Self::Unavailable,
        }
    }
}

impl From<Availability> for RawAvailability {
    fn from(value: Availability) -> Self {
        match value {
            Availability::AlwaysInStock => Self::Flag(true),
            Availability::Unavailable => Self::Flag(false),
            Availability::Remaining(count) => Self::Count(i64::from(count)),
        }
    }
}

fn clamp_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InventorySeedError {
    #[error("inventory seed must be a JSON object of categories")]
    NotAnObject,
    #[error("inventory category `{category}` item `{item}` has unsupported availability `{value}`")]
    InvalidAvailability { category: String, item: String, value: String },
}

/// Category → item → availability, mutated in place by order resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryStore {
    categories: BTreeMap<String, BTreeMap<String, Availability>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a seed document such as
    /// `{"drink": {"latte": 5, "mocha": true}, "_id": "1"}`.
    ///
    /// Keys starting with `_` and non-object category values are document
    /// metadata and are skipped.
    pub fn from_seed(document: &Value) -> Result<Self, InventorySeedError> {
        let Some(categories) = document.as_object() else {
            return Err(InventorySeedError::NotAnObject);
        };

        let mut store = Self::new();
        for (category, items) in categories {
            if category.starts_with('_') {
                continue;
            }
            let Some(items) = items.as_object() else {
                continue;
            };

            for (item, value) in items {
                let availability =
                    serde_json::from_value::<Availability>(value.clone()).map_err(|_| {
                        InventorySeedError::InvalidAvailability {
                            category: category.clone(),
                            item: item.clone(),
                            value: value.to_string(),
                        }
                    })?;
                store.insert(category.clone(), item.clone(), availability);
            }
        }

        Ok(store)
    }

    pub fn insert(
        &mut self,
        category: impl Into<String>,
        item: impl Into<String>,
        availability: Availability,
    ) {
        self.categories.entry(category.into()).or_default().insert(item.into(), availability);
    }

    pub fn availability(&self, category: &str, item: &str) -> Option<Availability> {
        self.categories.get(category).and_then(|items| items.get(item)).copied()
    }

    /// Check only. Missing categories or items are unavailable.
    pub fn can_fulfil(&self, category: &str, item: &str, requested: u32) -> bool {
        self.availability(category, item).is_some_and(|stock| stock.covers(requested))
    }

    /// Check-then-decrement. Returns `false` and leaves the store untouched
    /// when the pair is missing or short.
    pub fn reserve(&mut self, category: &str, item: &str, requested: u32) -> bool {
        let Some(stock) = self.categories.get_mut(category).and_then(|items| items.get_mut(item))
        else {
            return false;
        };

        match stock {
            Availability::AlwaysInStock => true,
            Availability::Unavailable => false,
            Availability::Remaining(remaining) if *remaining >= requested => {
                *remaining -= requested;
                true
            }
            Availability::Remaining(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(BTreeMap::is_empty)
    }

    pub fn item_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Availability, InventorySeedError, InventoryStore};

    #[test]
    fn seed_accepts_flags_counts_and_skips_metadata() {
        let store = InventoryStore::from_seed(&json!({
            "_id": "1",
            "_rev": "3-abc",
            "drink": { "latte": 5, "drip": true, "chai": false },
            "food": { "muffin": -2, "bagel": 4.0 },
            "note": "not a category"
        }))
        .expect("seed should parse");

        assert_eq!(store.availability("drink", "latte"), Some(Availability::Remaining(5)));
        assert_eq!(store.availability("drink", "drip"), Some(Availability::AlwaysInStock));
        assert_eq!(store.availability("drink", "chai"), Some(Availability::Unavailable));
        assert_eq!(store.availability("food", "muffin"), Some(Availability::Remaining(0)));
        assert_eq!(store.availability("food", "bagel"), Some(Availability::Remaining(4)));
        assert_eq!(store.item_count(), 5);
        assert!(store.availability("_id", "1").is_none());
    }

    #[test]
    fn seed_rejects_non_object_and_bad_values() {
        assert_eq!(InventoryStore::from_seed(&json!([1, 2])), Err(InventorySeedError::NotAnObject));

        let error = InventoryStore::from_seed(&json!({ "drink": { "latte": "lots" } }))
            .expect_err("string availability should fail");
        assert!(matches!(
            error,
            InventorySeedError::InvalidAvailability { ref category, ref item, .. }
                if category == "drink" && item == "latte"
        ));
    }

    #[test]
    fn reserve_decrements_counted_stock_only_when_sufficient() {
        let mut store = InventoryStore::new();
        store.insert("drink", "latte", Availability::Remaining(5));

        assert!(store.reserve("drink", "latte", 2));
        assert_eq!(store.availability("drink", "latte"), Some(Availability::Remaining(3)));

        assert!(!store.reserve("drink", "latte", 4));
        assert_eq!(store.availability("drink", "latte"), Some(Availability::Remaining(3)));

        assert!(store.reserve("drink", "latte", 3));
        assert_eq!(store.availability("drink", "latte"), Some(Availability::Remaining(0)));
    }

    #[test]
    fn always_in_stock_is_never_decremented() {
        let mut store = InventoryStore::new();
        store.insert("size", "large", Availability::AlwaysInStock);

        assert!(store.reserve("size", "large", 1_000));
        assert_eq!(store.availability("size", "large"), Some(Availability::AlwaysInStock));
    }

    #[test]
    fn missing_pairs_and_empty_store_are_unavailable() {
        let mut store = InventoryStore::new();
        assert!(store.is_empty());
        assert!(!store.reserve("drink", "latte", 1));
        assert!(!store.can_fulfil("drink", "latte", 1));

        store.insert("drink", "latte", Availability::Remaining(1));
        assert!(!store.reserve("drink", "mocha", 1));
        assert!(!store.reserve("food", "latte", 1));
        assert!(store.can_fulfil("drink", "latte", 1));
    }

    #[test]
    fn serializes_back_to_seed_shape() {
        let mut store = InventoryStore::new();
        store.insert("drink", "latte", Availability::Remaining(3));
        store.insert("size", "large", Availability::AlwaysInStock);

        let value = serde_json::to_value(&store).expect("serialize");
        assert_eq!(value, json!({ "drink": { "latte": 3 }, "size": { "large": true } }));
    }
}
