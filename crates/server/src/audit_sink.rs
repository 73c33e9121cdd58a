use brewline_core::audit::{AuditEvent, AuditSink};
use tracing::info;

/// Writes audit events to the log stream under the `audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        info!(
            target: "audit",
            event_name = "audit.event",
            event_id = %event.event_id,
            turn_id = %event.turn_id,
            correlation_id = %event.correlation_id,
            event_type = %event.event_type,
            category = ?event.category,
            outcome = ?event.outcome,
            actor = %event.actor,
            metadata = %metadata,
            "audit event recorded"
        );
    }
}
