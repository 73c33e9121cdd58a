use std::collections::BTreeMap;

use brewline_core::domain::inventory::InventoryStore;
use brewline_core::domain::order::{EntityKind, RejectionPolicy};
use brewline_core::errors::DomainError;

use crate::nlu::RuntimeEntity;

pub const OUT_OF_STOCK_MESSAGE: &str = "Unfortunately, we're all out of that item today.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    OutOfStock { category: String, item: String, requested: u32 },
}

impl RejectReason {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::OutOfStock { .. } => OUT_OF_STOCK_MESSAGE,
        }
    }
}

impl From<RejectReason> for DomainError {
    fn from(value: RejectReason) -> Self {
        match value {
            RejectReason::OutOfStock { category, item, requested } => {
                Self::OutOfStock { category, item, requested }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl OrderOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Checks every non-number entity of an order against inventory, using the
/// entity kind as category and the value as item.
#[derive(Clone, Debug, Default)]
pub struct OrderResolver {
    policy: RejectionPolicy,
}

impl OrderResolver {
    pub fn new(policy: RejectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RejectionPolicy {
        self.policy
    }

    pub fn resolve(
        &self,
        inventory: &mut InventoryStore,
        entities: &[RuntimeEntity],
        quantity: u32,
    ) -> OrderOutcome {
        match self.policy {
            RejectionPolicy::PartialCommitOnReject => {
                resolve_in_order(inventory, entities, quantity)
            }
            RejectionPolicy::Atomic => resolve_two_phase(inventory, entities, quantity),
        }
    }
}

fn checked_entities(entities: &[RuntimeEntity]) -> impl Iterator<Item = &RuntimeEntity> {
    entities.iter().filter(|entity| !EntityKind::of(&entity.entity).is_number())
}

fn out_of_stock(entity: &RuntimeEntity, quantity: u32) -> OrderOutcome {
    OrderOutcome::Rejected(RejectReason::OutOfStock {
        category: entity.entity.clone(),
        item: entity.value.clone(),
        requested: quantity,
    })
}

// Stops at the first short item. Decrements made for earlier items stay.
fn resolve_in_order(
    inventory: &mut InventoryStore,
    entities: &[RuntimeEntity],
    quantity: u32,
) -> OrderOutcome {
    for entity in checked_entities(entities) {
        if !inventory.reserve(&entity.entity, &entity.value, quantity) {
            return out_of_stock(entity, quantity);
        }
    }
    OrderOutcome::Accepted
}

fn resolve_two_phase(
    inventory: &mut InventoryStore,
    entities: &[RuntimeEntity],
    quantity: u32,
) -> OrderOutcome {
    // Repeated pairs within one order draw from the same stock.
    let mut demand: BTreeMap<(&str, &str), u32> = BTreeMap::new();
    for entity in checked_entities(entities) {
        let total = demand.entry((entity.entity.as_str(), entity.value.as_str())).or_insert(0);
        *total = total.saturating_add(quantity);
        if !inventory.can_fulfil(&entity.entity, &entity.value, *total) {
            return out_of_stock(entity, quantity);
        }
    }

    for entity in checked_entities(entities) {
        inventory.reserve(&entity.entity, &entity.value, quantity);
    }
    OrderOutcome::Accepted
}
