use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use brewline_agent::runtime::AgentRuntime;
use chrono::Utc;
use serde::Serialize;

use crate::inventory_source::{InventoryLoadStatus, InventoryLoadTracker};

#[derive(Clone)]
pub struct HealthState {
    pub runtime: Arc<AgentRuntime>,
    pub inventory_load: InventoryLoadTracker,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub inventory: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let inventory = inventory_check(&state);
    let ready = inventory.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "brewline-server runtime initialized".to_string(),
        },
        inventory,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn inventory_check(state: &HealthState) -> HealthCheck {
    if state.runtime.is_seeded() {
        let item_count = state.runtime.inventory_snapshot().item_count();
        return HealthCheck { status: "ready", detail: format!("{item_count} items seeded") };
    }

    let detail = match state.inventory_load.status() {
        InventoryLoadStatus::NotConfigured => "no inventory source configured".to_string(),
        InventoryLoadStatus::Pending => "inventory seed still loading".to_string(),
        InventoryLoadStatus::Loaded { .. } => "inventory seed not applied".to_string(),
        InventoryLoadStatus::Failed(reason) => format!("inventory seed failed: {reason}"),
    };
    HealthCheck { status: "degraded", detail }
}
