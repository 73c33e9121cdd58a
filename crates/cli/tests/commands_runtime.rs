use std::env;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

use brewline_cli::commands::config;
use brewline_cli::commands::simulate::{self, SimulateOptions};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

#[test]
fn config_reports_effective_values_with_sources() {
    with_env(
        &[("BREWLINE_NLU_WORKSPACE_ID", "ws-test"), ("CONVERSATION_PASSWORD", "hunter2")],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "expected config inspection to succeed");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "config");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            assert!(message.contains(
                "- nlu.workspace_id = ws-test (source: env (BREWLINE_NLU_WORKSPACE_ID))"
            ));
            let password_line =
                "- nlu.password = <redacted> (source: env (CONVERSATION_PASSWORD))";
            assert!(message.contains(password_line));
            assert!(message.contains("- ordering.wait_time_minutes = 10 (source: default)"));
            assert!(!message.contains("hunter2"));
        },
    );
}

#[test]
fn config_returns_validation_failure_for_bad_env_value() {
    with_env(&[("BREWLINE_SERVER_PORT", "not-a-port")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn simulate_replays_turns_and_reports_final_state() {
    let inventory = json_file(&json!({
        "_id": "inventory",
        "drink": { "latte": 5 },
        "size": { "large": true },
        "pastry": { "muffin": 1 }
    }));
    let turns = json_file(&json!([
        {
            "intents": [{ "intent": "order", "confidence": 0.94 }],
            "entities": [
                { "entity": "drink", "value": "latte" },
                { "entity": "size", "value": "large" },
                { "entity": "number", "value": "2" }
            ],
            "output": { "text": ["{0}"] }
        },
        {
            "intents": [{ "intent": "order", "confidence": 0.91 }],
            "entities": [
                { "entity": "pastry", "value": "muffin" },
                { "entity": "number", "value": "3" }
            ],
            "output": { "text": ["{0}"] }
        },
        {
            "intents": [{ "intent": "provide_id", "confidence": 0.88 }],
            "output": { "text": ["Your order will be ready in", "{0}", "minutes."] }
        },
        {
            "intents": [{ "intent": "review_order", "confidence": 0.9 }],
            "output": { "text": ["So far:", "{0}"] }
        }
    ]));

    let result = simulate::run(SimulateOptions {
        inventory_path: inventory.path(),
        turns_path: turns.path(),
        atomic: false,
        wait_time_minutes: Some(7),
    });
    assert_eq!(result.exit_code, 0, "expected simulation to succeed");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "simulate");
    assert_eq!(payload["status"], "ok");

    let report = &payload["report"];
    assert_eq!(report["rejection_policy"], "partial_commit_on_reject");
    assert_eq!(report["turns"][0]["text"], json!(["Great! We've added your order to the cart."]));
    assert_eq!(
        report["turns"][1]["text"],
        json!(["Unfortunately, we're all out of that item today."])
    );
    assert_eq!(report["turns"][2]["text"], json!(["Your order will be ready in 7 minutes."]));
    assert_eq!(report["turns"][3]["text"], json!(["So far: 2 large lattes"]));
    assert_eq!(report["cart"], json!([{ "key": "latte:large:0:0", "quantity": 2 }]));
    assert_eq!(report["inventory"]["drink"]["latte"], 3);
    assert_eq!(report["inventory"]["pastry"]["muffin"], 1);
}

#[test]
fn simulate_rejects_missing_inventory_file_as_input_error() {
    let turns = json_file(&json!([]));

    let result = simulate::run(SimulateOptions {
        inventory_path: "does-not-exist.json".as_ref(),
        turns_path: turns.path(),
        atomic: true,
        wait_time_minutes: None,
    });
    assert_eq!(result.exit_code, 3, "expected input error code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "input");
    assert!(payload["message"].as_str().unwrap_or("").contains("does-not-exist.json"));
}

#[test]
fn simulate_rejects_turns_that_are_not_an_array() {
    let inventory = json_file(&json!({ "drink": { "latte": 1 } }));
    let turns = json_file(&json!({ "intents": [] }));

    let result = simulate::run(SimulateOptions {
        inventory_path: inventory.path(),
        turns_path: turns.path(),
        atomic: false,
        wait_time_minutes: None,
    });

    assert_eq!(result.exit_code, 3);
    assert_eq!(parse_payload(&result.output)["error_class"], "input");
}

fn json_file(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(value.to_string().as_bytes()).expect("write json");
    file
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BREWLINE_NLU_URL",
        "BREWLINE_NLU_USERNAME",
        "BREWLINE_NLU_PASSWORD",
        "BREWLINE_NLU_WORKSPACE_ID",
        "BREWLINE_NLU_VERSION_DATE",
        "BREWLINE_NLU_TIMEOUT_SECS",
        "BREWLINE_INVENTORY_URL",
        "BREWLINE_INVENTORY_USERNAME",
        "BREWLINE_INVENTORY_PASSWORD",
        "BREWLINE_INVENTORY_SEED_PATH",
        "BREWLINE_SERVER_BIND_ADDRESS",
        "BREWLINE_SERVER_PORT",
        "BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "BREWLINE_SERVER_STATIC_DIR",
        "BREWLINE_ORDERING_WAIT_TIME_MINUTES",
        "BREWLINE_ORDERING_REJECTION_POLICY",
        "BREWLINE_LOGGING_LEVEL",
        "BREWLINE_LOGGING_FORMAT",
        "BREWLINE_LOG_LEVEL",
        "BREWLINE_LOG_FORMAT",
        "WORKSPACE_ID",
        "CONVERSATION_USERNAME",
        "CONVERSATION_PASSWORD",
        "NO_SQL_USERNAME",
        "NO_SQL_PASSWORD",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
