//! Replays recorded NLU turns against a fresh session without the HTTP server
//! or the NLU service.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use brewline_agent::nlu::MessageResponse;
use brewline_agent::resolver::OrderOutcome;
use brewline_agent::runtime::{AgentRuntime, RuntimeSettings, TurnOutcome};
use brewline_core::audit::InMemoryAuditSink;
use brewline_core::domain::inventory::InventoryStore;
use brewline_core::domain::order::RejectionPolicy;
use serde::Serialize;
use serde_json::Value;

use crate::commands::{CommandResult, EXIT_INPUT};

#[derive(Clone, Debug)]
pub struct SimulateOptions<'a> {
    pub inventory_path: &'a Path,
    pub turns_path: &'a Path,
    pub atomic: bool,
    pub wait_time_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TurnReport {
    pub intent: Option<String>,
    pub outcome: &'static str,
    pub text: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CartLineReport {
    pub key: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub rejection_policy: RejectionPolicy,
    pub turns: Vec<TurnReport>,
    pub cart: Vec<CartLineReport>,
    pub inventory: InventoryStore,
    pub audit_events: usize,
}

pub fn run(options: SimulateOptions<'_>) -> CommandResult {
    let (inventory, turns) = match load_inputs(options.inventory_path, options.turns_path) {
        Ok(inputs) => inputs,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "input",
                format!("{error:#}"),
                EXIT_INPUT,
            );
        }
    };

    let report = simulate(inventory, turns, settings(&options));
    let message = format!(
        "replayed {} turns; cart holds {} lines",
        report.turns.len(),
        report.cart.len()
    );

    match serde_json::to_value(&report) {
        Ok(value) => CommandResult::success_with_report("simulate", message, Some(value)),
        Err(error) => CommandResult::failure(
            "simulate",
            "serialization",
            format!("report could not be serialized: {error}"),
            EXIT_INPUT,
        ),
    }
}

fn settings(options: &SimulateOptions<'_>) -> RuntimeSettings {
    let defaults = RuntimeSettings::default();
    RuntimeSettings {
        wait_time_minutes: options.wait_time_minutes.unwrap_or(defaults.wait_time_minutes),
        rejection_policy: if options.atomic {
            RejectionPolicy::Atomic
        } else {
            RejectionPolicy::PartialCommitOnReject
        },
    }
}

fn load_inputs(
    inventory_path: &Path,
    turns_path: &Path,
) -> Result<(InventoryStore, Vec<MessageResponse>)> {
    let seed = read_json(inventory_path)?;
    let inventory = InventoryStore::from_seed(&seed)
        .with_context(|| format!("invalid inventory seed `{}`", inventory_path.display()))?;

    let turns = read_json(turns_path)?;
    let turns = serde_json::from_value::<Vec<MessageResponse>>(turns).with_context(|| {
        format!("`{}` must be a JSON array of nlu responses", turns_path.display())
    })?;

    Ok((inventory, turns))
}

fn read_json(path: &Path) -> Result<Value> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("`{}` is not valid JSON", path.display()))
}

pub fn simulate(
    inventory: InventoryStore,
    turns: Vec<MessageResponse>,
    settings: RuntimeSettings,
) -> SimulationReport {
    let audit = InMemoryAuditSink::default();
    let runtime = AgentRuntime::new(settings, Arc::new(audit.clone()));
    runtime.populate_inventory(inventory);

    let turns = turns
        .into_iter()
        .enumerate()
        .map(|(index, turn)| {
            let intent = turn.top_intent().map(str::to_string);
            let handled = runtime.handle_turn(turn, &format!("simulate-{}", index + 1));
            TurnReport {
                intent,
                outcome: outcome_label(&handled.outcome),
                text: handled.response.output.text,
            }
        })
        .collect();

    let cart = runtime
        .cart_snapshot()
        .legacy_entries()
        .into_iter()
        .map(|(key, quantity)| CartLineReport { key, quantity })
        .collect();

    SimulationReport {
        rejection_policy: settings.rejection_policy,
        turns,
        cart,
        inventory: runtime.inventory_snapshot(),
        audit_events: audit.events().len(),
    }
}

fn outcome_label(outcome: &TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Order(OrderOutcome::Accepted) => "accepted",
        TurnOutcome::Order(OrderOutcome::Rejected(_)) => "rejected",
        TurnOutcome::WaitTime(_) => "wait_time",
        TurnOutcome::Review(_) => "review",
        TurnOutcome::Passthrough => "passthrough",
    }
}
