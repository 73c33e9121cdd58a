//! Brewline core - inventory, cart and reply rendering for the ordering assistant.
//!
//! Everything in this crate is synchronous and deterministic. Session state is
//! plain data (`InventoryStore`, `Cart`); locking and I/O live in the callers.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod summary;
pub mod template;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use domain::cart::{Cart, CartKey, CartLine};
pub use domain::inventory::{Availability, InventorySeedError, InventoryStore};
pub use domain::order::{EntityKind, Modifiers, ParsedOrderRequest, RejectionPolicy};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use summary::render_order_summary;
pub use template::{fill_placeholders, replace_params};
