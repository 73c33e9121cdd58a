//! Natural-language rendering of cart contents for `review_order` replies.

use crate::domain::cart::{Cart, CartKey, CartLine, NO_MODIFIER};

pub fn render_order_summary(cart: &Cart) -> String {
    cart.lines().iter().map(render_line).collect::<Vec<_>>().join(", ")
}

pub fn render_line(line: &CartLine) -> String {
    let CartKey { item, modifiers } = &line.key;
    match modifiers {
        None => plain_phrase(item, line.quantity),
        Some(modifiers) => drink_phrase(
            item,
            &modifiers.size,
            modifiers.milk.as_deref(),
            modifiers.flavor.as_deref(),
            line.quantity,
        ),
    }
}

/// Renders a single `item` or `item:size:milk:flavor` key. Keys with any
/// other component count fall back to the plain form.
pub fn render_legacy_entry(key: &str, quantity: u32) -> String {
    let parts = key.split(':').collect::<Vec<_>>();
    match parts.as_slice() {
        [item, size, milk, flavor] => {
            drink_phrase(item, size, present(milk), present(flavor), quantity)
        }
        _ => plain_phrase(key, quantity),
    }
}

fn present(value: &str) -> Option<&str> {
    (value != NO_MODIFIER).then_some(value)
}

fn plain_phrase(item: &str, quantity: u32) -> String {
    format!("{quantity} {}", pluralize(item, quantity))
}

fn drink_phrase(
    item: &str,
    size: &str,
    milk: Option<&str>,
    flavor: Option<&str>,
    quantity: u32,
) -> String {
    let mut phrase = format!("{quantity} {size} {}", pluralize(item, quantity));
    match (milk, flavor) {
        (Some(milk), None) => phrase.push_str(&format!(" with {milk} milk")),
        (None, Some(flavor)) => phrase.push_str(&format!(" with {flavor}")),
        (Some(milk), Some(flavor)) => phrase.push_str(&format!(" with {milk} milk and {flavor}")),
        (None, None) => {}
    }
    phrase
}

// Suffix only; no irregular plurals.
fn pluralize(item: &str, quantity: u32) -> String {
    if quantity > 1 {
        format!("{item}s")
    } else {
        item.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::cart::{Cart, CartKey};
    use crate::domain::order::Modifiers;

    use super::{render_legacy_entry, render_order_summary};

    fn modifiers(size: &str, milk: Option<&str>, flavor: Option<&str>) -> Modifiers {
        Modifiers {
            size: size.to_string(),
            milk: milk.map(str::to_string),
            flavor: flavor.map(str::to_string),
        }
    }

    #[test]
    fn empty_cart_renders_empty_string() {
        assert_eq!(render_order_summary(&Cart::new()), "");
    }

    #[test]
    fn plain_items_pluralize_by_suffix() {
        let mut cart = Cart::new();
        cart.add(CartKey::plain("muffin"), 1);
        assert_eq!(render_order_summary(&cart), "1 muffin");

        cart.add(CartKey::plain("muffin"), 2);
        assert_eq!(render_order_summary(&cart), "3 muffins");
    }

    #[test]
    fn drinks_render_size_and_modifier_phrasing() {
        let mut cart = Cart::new();
        cart.add(CartKey::drink("latte", modifiers("large", Some("skim"), Some("vanilla"))), 2);
        assert_eq!(render_order_summary(&cart), "2 large lattes with skim milk and vanilla");

        let mut cart = Cart::new();
        cart.add(CartKey::drink("coffee", Modifiers::default()), 1);
        assert_eq!(render_order_summary(&cart), "1 small coffee");

        let mut cart = Cart::new();
        cart.add(CartKey::drink("mocha", modifiers("medium", Some("oat"), None)), 1);
        cart.add(CartKey::drink("cappuccino", modifiers("small", None, Some("hazelnut"))), 3);
        assert_eq!(
            render_order_summary(&cart),
            "1 medium mocha with oat milk, 3 small cappuccinos with hazelnut"
        );
    }

    #[test]
    fn entries_join_in_insertion_order() {
        let mut cart = Cart::new();
        cart.add(CartKey::plain("scone"), 1);
        cart.add(CartKey::drink("latte", modifiers("large", None, None)), 2);
        cart.add(CartKey::plain("bagel"), 2);

        assert_eq!(render_order_summary(&cart), "1 scone, 2 large lattes, 2 bagels");
    }

    #[test]
    fn legacy_keys_render_like_structured_ones() {
        assert_eq!(
            render_legacy_entry("latte:large:skim:vanilla", 2),
            "2 large lattes with skim milk and vanilla"
        );
        assert_eq!(render_legacy_entry("coffee:small:0:0", 1), "1 small coffee");
        assert_eq!(render_legacy_entry("muffin", 3), "3 muffins");
        assert_eq!(render_legacy_entry("odd:key", 1), "1 odd:key");
    }
}
