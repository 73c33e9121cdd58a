use brewline_core::domain::order::{coerce_quantity, EntityKind, ParsedOrderRequest};
use tracing::warn;

use crate::nlu::RuntimeEntity;

/// Folds one turn's entities into a `ParsedOrderRequest`.
#[derive(Clone, Debug, Default)]
pub struct EntityClassifier;

impl EntityClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, entities: &[RuntimeEntity]) -> ParsedOrderRequest {
        let mut request = ParsedOrderRequest::default();

        // Last number wins. Values that don't coerce leave the previous quantity.
        for entity in entities.iter().filter(|entity| EntityKind::of(&entity.entity).is_number()) {
            match coerce_quantity(&entity.value) {
                Some(quantity) => request.quantity = quantity,
                None => warn!(
                    event_name = "agent.classifier.quantity_ignored",
                    value = %entity.value,
                    "number entity did not coerce to a positive quantity"
                ),
            }
        }

        for entity in entities {
            let value = entity.value.clone();
            match EntityKind::of(&entity.entity) {
                EntityKind::Number => {}
                EntityKind::Drink => {
                    request.is_drink = true;
                    request.primary_item = Some(value);
                }
                EntityKind::Size => request.modifiers.size = value,
                EntityKind::Milk => request.modifiers.milk = Some(value),
                EntityKind::Flavor => request.modifiers.flavor = Some(value),
                EntityKind::Item => request.primary_item = Some(value),
            }
        }

        request
    }
}

#[cfg(test)]
mod tests {
    use brewline_core::domain::order::{Modifiers, ParsedOrderRequest};

    use super::EntityClassifier;
    use crate::nlu::RuntimeEntity;

    fn entities(pairs: &[(&str, &str)]) -> Vec<RuntimeEntity> {
        pairs.iter().map(|(kind, value)| RuntimeEntity::new(*kind, *value)).collect()
    }

    #[test]
    fn no_entities_keep_defaults() {
        assert_eq!(EntityClassifier::new().classify(&[]), ParsedOrderRequest::default());
    }

    #[test]
    fn drink_with_all_modifiers() {
        let request = EntityClassifier::new().classify(&entities(&[
            ("number", "2"),
            ("coffee", "latte"),
            ("size", "large"),
            ("milk", "skim"),
            ("flavor", "vanilla"),
        ]));

        assert_eq!(
            request,
            ParsedOrderRequest {
                quantity: 2,
                is_drink: true,
                primary_item: Some("latte".to_string()),
                modifiers: Modifiers {
                    size: "large".to_string(),
                    milk: Some("skim".to_string()),
                    flavor: Some("vanilla".to_string()),
                },
            }
        );
    }

    #[test]
    fn last_number_wins() {
        let request = EntityClassifier::new()
            .classify(&entities(&[("number", "2"), ("pastry", "muffin"), ("number", "5")]));
        assert_eq!(request.quantity, 5);
        assert!(!request.is_drink);
        assert_eq!(request.primary_item.as_deref(), Some("muffin"));
    }

    #[test]
    fn unusable_number_keeps_previous_quantity() {
        let request = EntityClassifier::new()
            .classify(&entities(&[("number", "3"), ("number", "a few"), ("drink", "mocha")]));
        assert_eq!(request.quantity, 3);

        let request = EntityClassifier::new().classify(&entities(&[("number", "0")]));
        assert_eq!(request.quantity, 1);
    }

    #[test]
    fn last_item_entity_becomes_primary() {
        let request = EntityClassifier::new().classify(&entities(&[
            ("drink", "latte"),
            ("pastry", "scone"),
            ("size", "medium"),
        ]));

        // The drink flag sticks even though a later item replaced the drink.
        assert!(request.is_drink);
        assert_eq!(request.primary_item.as_deref(), Some("scone"));
        assert_eq!(request.modifiers.size, "medium");
    }
}
