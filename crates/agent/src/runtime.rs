use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use brewline_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use brewline_core::config::OrderingConfig;
use brewline_core::domain::cart::Cart;
use brewline_core::domain::inventory::InventoryStore;
use brewline_core::domain::order::RejectionPolicy;
use brewline_core::summary::render_order_summary;
use brewline_core::template::replace_params;
use tracing::{info, warn};

use crate::classifier::EntityClassifier;
use crate::nlu::MessageResponse;
use crate::resolver::{OrderOutcome, OrderResolver};

pub const ACCEPTED_MESSAGE: &str = "Great! We've added your order to the cart.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnIntent {
    Order,
    ProvideId,
    ReviewOrder,
    Other,
}

impl TurnIntent {
    /// Routes on the top intent. An `order` without entities is not an order.
    pub fn of(response: &MessageResponse) -> Self {
        match response.top_intent() {
            Some("order") if !response.entities.is_empty() => Self::Order,
            Some("provide_id") => Self::ProvideId,
            Some("review_order") => Self::ReviewOrder,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    Order(OrderOutcome),
    WaitTime(u32),
    Review(String),
    Passthrough,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandledTurn {
    pub response: MessageResponse,
    pub outcome: TurnOutcome,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub wait_time_minutes: u32,
    pub rejection_policy: RejectionPolicy,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { wait_time_minutes: 10, rejection_policy: RejectionPolicy::PartialCommitOnReject }
    }
}

impl From<&OrderingConfig> for RuntimeSettings {
    fn from(config: &OrderingConfig) -> Self {
        Self {
            wait_time_minutes: config.wait_time_minutes,
            rejection_policy: config.rejection_policy,
        }
    }
}

/// Mutable state shared by every turn handled by one runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderSession {
    pub inventory: InventoryStore,
    pub cart: Cart,
    pub seeded: bool,
}

/// Dispatches NLU turns against a single `OrderSession`.
///
/// The session lock is held for the whole classify, resolve, aggregate and
/// render sequence of a turn, so concurrent orders cannot oversell.
pub struct AgentRuntime {
    session: Mutex<OrderSession>,
    classifier: EntityClassifier,
    resolver: OrderResolver,
    settings: RuntimeSettings,
    audit: Arc<dyn AuditSink>,
}

impl Default for AgentRuntime {
    fn default() -> Self {
        Self::new(RuntimeSettings::default(), Arc::new(NoopAuditSink))
    }
}

impl AgentRuntime {
    pub fn new(settings: RuntimeSettings, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            session: Mutex::new(OrderSession::default()),
            classifier: EntityClassifier::new(),
            resolver: OrderResolver::new(settings.rejection_policy),
            settings,
            audit,
        }
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.settings
    }

    /// Replaces the inventory. The seed may arrive after turns have been
    /// handled; the cart is kept.
    pub fn populate_inventory(&self, inventory: InventoryStore) {
        let item_count = inventory.item_count();
        let mut session = self.lock_session();
        session.inventory = inventory;
        session.seeded = true;
        info!(
            event_name = "agent.runtime.inventory_populated",
            item_count,
            "inventory seed applied"
        );
    }

    pub fn is_seeded(&self) -> bool {
        self.lock_session().seeded
    }

    pub fn inventory_snapshot(&self) -> InventoryStore {
        self.lock_session().inventory.clone()
    }

    pub fn cart_snapshot(&self) -> Cart {
        self.lock_session().cart.clone()
    }

    pub fn handle_turn(&self, mut response: MessageResponse, correlation_id: &str) -> HandledTurn {
        let audit = AuditContext::new(correlation_id, "order-runtime");
        let intent = TurnIntent::of(&response);

        let (outcome, args) = match intent {
            TurnIntent::Order => {
                let outcome = self.handle_order(&response, &audit);
                let message = match &outcome {
                    OrderOutcome::Accepted => ACCEPTED_MESSAGE,
                    OrderOutcome::Rejected(reason) => reason.user_message(),
                };
                (TurnOutcome::Order(outcome), vec![message.to_string()])
            }
            TurnIntent::ProvideId => {
                let minutes = self.settings.wait_time_minutes;
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "wait.quoted",
                        AuditCategory::Wait,
                        AuditOutcome::Success,
                    )
                    .with_metadata("minutes", minutes.to_string()),
                );
                (TurnOutcome::WaitTime(minutes), vec![minutes.to_string()])
            }
            TurnIntent::ReviewOrder => {
                let summary = render_order_summary(&self.lock_session().cart);
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "cart.reviewed",
                        AuditCategory::Review,
                        AuditOutcome::Success,
                    )
                    .with_metadata("summary", summary.clone()),
                );
                (TurnOutcome::Review(summary.clone()), vec![summary])
            }
            TurnIntent::Other => {
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "turn.passthrough",
                        AuditCategory::Passthrough,
                        AuditOutcome::Success,
                    )
                    .with_metadata("intent", response.top_intent().unwrap_or("<none>")),
                );
                return HandledTurn { response, outcome: TurnOutcome::Passthrough };
            }
        };

        response.output.text = replace_params(response.output.text.take(), Some(&args));
        HandledTurn { response, outcome }
    }

    fn handle_order(&self, response: &MessageResponse, audit: &AuditContext) -> OrderOutcome {
        let request = self.classifier.classify(&response.entities);

        let mut guard = self.lock_session();
        let session = &mut *guard;
        let outcome =
            self.resolver.resolve(&mut session.inventory, &response.entities, request.quantity);

        match &outcome {
            OrderOutcome::Accepted => match session.cart.aggregate(&request) {
                Some(line) => {
                    info!(
                        event_name = "agent.runtime.order_accepted",
                        correlation_id = %audit.correlation_id,
                        turn_id = %audit.turn_id,
                        cart_key = %line.key,
                        quantity = request.quantity,
                        line_total = line.quantity,
                        "order added to cart"
                    );
                    self.audit.emit(
                        AuditEvent::new(
                            audit,
                            "order.accepted",
                            AuditCategory::Order,
                            AuditOutcome::Success,
                        )
                        .with_metadata("cart_key", line.key.to_string())
                        .with_metadata("quantity", request.quantity.to_string())
                        .with_metadata("line_total", line.quantity.to_string()),
                    );
                }
                None => {
                    warn!(
                        event_name = "agent.runtime.order_without_item",
                        correlation_id = %audit.correlation_id,
                        turn_id = %audit.turn_id,
                        "accepted order named no item; cart unchanged"
                    );
                    self.audit.emit(AuditEvent::new(
                        audit,
                        "order.accepted_without_item",
                        AuditCategory::Order,
                        AuditOutcome::Success,
                    ));
                }
            },
            OrderOutcome::Rejected(reason) => {
                let detail = brewline_core::errors::DomainError::from(reason.clone()).to_string();
                info!(
                    event_name = "agent.runtime.order_rejected",
                    correlation_id = %audit.correlation_id,
                    turn_id = %audit.turn_id,
                    policy = ?self.resolver.policy(),
                    reason = %detail,
                    "order rejected"
                );
                self.audit.emit(
                    AuditEvent::new(
                        audit,
                        "order.rejected",
                        AuditCategory::Order,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason", detail),
                );
            }
        }

        outcome
    }

    fn lock_session(&self) -> MutexGuard<'_, OrderSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
