use serde::{Deserialize, Serialize};

pub const DEFAULT_SIZE: &str = "small";
pub const DEFAULT_QUANTITY: u32 = 1;

/// How an NLU entity kind participates in an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Number,
    Drink,
    Size,
    Milk,
    Flavor,
    Item,
}

impl EntityKind {
    pub fn of(kind: &str) -> Self {
        match kind {
            "number" => Self::Number,
            "coffee" | "drink" => Self::Drink,
            "size" => Self::Size,
            "milk" => Self::Milk,
            "flavor" => Self::Flavor,
            _ => Self::Item,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number)
    }
}

/// What happens to decrements already applied when a later item of the
/// same order is short.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Earlier decrements stay committed.
    #[default]
    #[serde(alias = "partial_commit")]
    PartialCommitOnReject,
    /// Every item is checked before anything is decremented.
    Atomic,
}

/// Drink modifiers. `milk` and `flavor` are `None` when not requested.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Modifiers {
    pub size: String,
    pub milk: Option<String>,
    pub flavor: Option<String>,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self { size: DEFAULT_SIZE.to_string(), milk: None, flavor: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOrderRequest {
    pub quantity: u32,
    pub is_drink: bool,
    pub primary_item: Option<String>,
    pub modifiers: Modifiers,
}

impl Default for ParsedOrderRequest {
    fn default() -> Self {
        Self {
            quantity: DEFAULT_QUANTITY,
            is_drink: false,
            primary_item: None,
            modifiers: Modifiers::default(),
        }
    }
}

/// Coerces an NLU number value into an order quantity.
///
/// Accepts integers and integral decimals (`"2"`, `" 3 "`, `"2.0"`). Anything
/// that is not a positive whole number yields `None`.
pub fn coerce_quantity(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if let Ok(quantity) = trimmed.parse::<u32>() {
        return (quantity > 0).then_some(quantity);
    }

    let value = trimmed.parse::<f64>().ok()?;
    let integral = value.is_finite() && value.fract() == 0.0;
    if !integral || value < 1.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::{coerce_quantity, EntityKind, Modifiers, ParsedOrderRequest};

    #[test]
    fn entity_kinds_map_to_order_roles() {
        assert_eq!(EntityKind::of("number"), EntityKind::Number);
        assert_eq!(EntityKind::of("coffee"), EntityKind::Drink);
        assert_eq!(EntityKind::of("drink"), EntityKind::Drink);
        assert_eq!(EntityKind::of("size"), EntityKind::Size);
        assert_eq!(EntityKind::of("milk"), EntityKind::Milk);
        assert_eq!(EntityKind::of("flavor"), EntityKind::Flavor);
        assert_eq!(EntityKind::of("pastry"), EntityKind::Item);
        assert_eq!(EntityKind::of("Number"), EntityKind::Item);
    }

    #[test]
    fn defaults_use_sentinel_modifiers() {
        let request = ParsedOrderRequest::default();
        assert_eq!(request.quantity, 1);
        assert!(!request.is_drink);
        assert_eq!(request.primary_item, None);
        assert_eq!(
            request.modifiers,
            Modifiers { size: "small".to_string(), milk: None, flavor: None }
        );
    }

    #[test]
    fn quantity_coercion_accepts_whole_numbers_only() {
        assert_eq!(coerce_quantity("2"), Some(2));
        assert_eq!(coerce_quantity(" 12 "), Some(12));
        assert_eq!(coerce_quantity("3.0"), Some(3));
        assert_eq!(coerce_quantity("0"), None);
        assert_eq!(coerce_quantity("-1"), None);
        assert_eq!(coerce_quantity("1.5"), None);
        assert_eq!(coerce_quantity("two"), None);
        assert_eq!(coerce_quantity("NaN"), None);
        assert_eq!(coerce_quantity(""), None);
    }
}
