use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use brewline_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    CommandResult::success("config", render(&config, detect_config_path().as_deref()))
}

pub fn render(config: &AppConfig, config_file_path: Option<&Path>) -> String {
    let config_file_doc = load_config_file_doc(config_file_path);

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(config) {
        let source =
            field_source(field.key, field.env_keys, config_file_doc.as_ref(), config_file_path);
        lines.push(render_line(field.key, &field.value, source));
    }

    if config.nlu.workspace_id().is_none() {
        lines.push(
            "warning: nlu.workspace_id is unset; every turn returns the configuration notice"
                .to_string(),
        );
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let nlu_password = if config.nlu.password.expose_secret().trim().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    };
    let inventory_password =
        if config.inventory.password.is_some() { "<redacted>" } else { "<unset>" };

    vec![
        Field { key: "nlu.url", value: config.nlu.url.clone(), env_keys: &["BREWLINE_NLU_URL"] },
        Field {
            key: "nlu.username",
            value: or_unset(Some(config.nlu.username.as_str())),
            env_keys: &["BREWLINE_NLU_USERNAME", "CONVERSATION_USERNAME"],
        },
        Field {
            key: "nlu.password",
            value: nlu_password.to_string(),
            env_keys: &["BREWLINE_NLU_PASSWORD", "CONVERSATION_PASSWORD"],
        },
        Field {
            key: "nlu.workspace_id",
            value: or_unset(config.nlu.workspace_id()),
            env_keys: &["BREWLINE_NLU_WORKSPACE_ID", "WORKSPACE_ID"],
        },
        Field {
            key: "nlu.version_date",
            value: config.nlu.version_date.clone(),
            env_keys: &["BREWLINE_NLU_VERSION_DATE"],
        },
        Field {
            key: "nlu.timeout_secs",
            value: config.nlu.timeout_secs.to_string(),
            env_keys: &["BREWLINE_NLU_TIMEOUT_SECS"],
        },
        Field {
            key: "inventory.url",
            value: config
                .inventory
                .url
                .as_deref()
                .map(redact_url)
                .unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["BREWLINE_INVENTORY_URL"],
        },
        Field {
            key: "inventory.username",
            value: or_unset(config.inventory.username.as_deref()),
            env_keys: &["BREWLINE_INVENTORY_USERNAME", "NO_SQL_USERNAME"],
        },
        Field {
            key: "inventory.password",
            value: inventory_password.to_string(),
            env_keys: &["BREWLINE_INVENTORY_PASSWORD", "NO_SQL_PASSWORD"],
        },
        Field {
            key: "inventory.seed_path",
            value: display_path(config.inventory.seed_path.as_deref()),
            env_keys: &["BREWLINE_INVENTORY_SEED_PATH"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["BREWLINE_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["BREWLINE_SERVER_PORT"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "server.static_dir",
            value: display_path(config.server.static_dir.as_deref()),
            env_keys: &["BREWLINE_SERVER_STATIC_DIR"],
        },
        Field {
            key: "ordering.wait_time_minutes",
            value: config.ordering.wait_time_minutes.to_string(),
            env_keys: &["BREWLINE_ORDERING_WAIT_TIME_MINUTES"],
        },
        Field {
            key: "ordering.rejection_policy",
            value: format!("{:?}", config.ordering.rejection_policy),
            env_keys: &["BREWLINE_ORDERING_REJECTION_POLICY"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["BREWLINE_LOGGING_LEVEL", "BREWLINE_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["BREWLINE_LOGGING_FORMAT", "BREWLINE_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["brewline.toml", "config/brewline.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => "<unset>".to_string(),
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "<unset>".to_string())
}

/// Masks `user:password@` credentials embedded in a store URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://***@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}
