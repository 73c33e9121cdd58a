use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::order::{Modifiers, ParsedOrderRequest};

/// Sentinel used for an absent milk or flavor in the `item:size:milk:flavor` form.
pub const NO_MODIFIER: &str = "0";

/// Aggregation identity of a cart line. Drinks carry their modifiers,
/// everything else is keyed by item alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CartKey {
    pub item: String,
    pub modifiers: Option<Modifiers>,
}

impl CartKey {
    pub fn plain(item: impl Into<String>) -> Self {
        Self { item: item.into(), modifiers: None }
    }

    pub fn drink(item: impl Into<String>, modifiers: Modifiers) -> Self {
        Self { item: item.into(), modifiers: Some(modifiers) }
    }

    /// `None` when the request names no item.
    pub fn for_request(request: &ParsedOrderRequest) -> Option<Self> {
        let item = request.primary_item.as_deref().filter(|item| !item.is_empty())?;
        Some(if request.is_drink {
            Self::drink(item, request.modifiers.clone())
        } else {
            Self::plain(item)
        })
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.modifiers {
            None => f.write_str(&self.item),
            Some(modifiers) => write!(
                f,
                "{}:{}:{}:{}",
                self.item,
                modifiers.size,
                modifiers.milk.as_deref().unwrap_or(NO_MODIFIER),
                modifiers.flavor.as_deref().unwrap_or(NO_MODIFIER)
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub key: CartKey,
    pub quantity: u32,
}

/// Accumulated order lines in first-ordered sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` to the line for `key`, creating it on first use.
    /// Returns the new line total.
    pub fn add(&mut self, key: CartKey, quantity: u32) -> u32 {
        if let Some(line) = self.lines.iter_mut().find(|line| line.key == key) {
            line.quantity = line.quantity.saturating_add(quantity);
            return line.quantity;
        }

        self.lines.push(CartLine { key, quantity });
        quantity
    }

    /// Folds an accepted order into the cart. Requests without an item are
    /// not added.
    pub fn aggregate(&mut self, request: &ParsedOrderRequest) -> Option<CartLine> {
        let key = CartKey::for_request(request)?;
        let quantity = self.add(key.clone(), request.quantity);
        Some(CartLine { key, quantity })
    }

    pub fn quantity(&self, key: &CartKey) -> u32 {
        self.lines.iter().find(|line| &line.key == key).map_or(0, |line| line.quantity)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines rendered with their `item:size:milk:flavor` keys.
    pub fn legacy_entries(&self) -> Vec<(String, u32)> {
        self.lines.iter().map(|line| (line.key.to_string(), line.quantity)).collect()
    }
}
