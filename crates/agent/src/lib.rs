//! Agent runtime - turns NLU responses into cart and inventory changes.
//!
//! A turn flows through a fixed pipeline:
//! 1. **Routing** (`runtime`) - pick a handler from the top intent
//! 2. **Classification** (`classifier`) - fold entities into a `ParsedOrderRequest`
//! 3. **Resolution** (`resolver`) - check and decrement inventory
//! 4. **Reply** - fill the `{0}` placeholder in the NLU's own reply text
//!
//! The NLU service only labels text. Stock checks, cart contents and wait
//! times are decided here and in `brewline-core`.

pub mod classifier;
pub mod nlu;
pub mod resolver;
pub mod runtime;

pub use classifier::EntityClassifier;
pub use nlu::{MessageRequest, MessageResponse, NluClient, NluError, RuntimeEntity};
pub use resolver::{OrderOutcome, OrderResolver, RejectReason};
pub use runtime::{AgentRuntime, HandledTurn, RuntimeSettings, TurnIntent, TurnOutcome};
