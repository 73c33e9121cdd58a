use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::RejectionPolicy;

/// Placeholder shipped in sample configs; treated the same as an unset id.
pub const WORKSPACE_PLACEHOLDER: &str = "<workspace-id>";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub nlu: NluConfig,
    pub inventory: InventoryConfig,
    pub server: ServerConfig,
    pub ordering: OrderingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    pub url: String,
    pub username: String,
    pub password: SecretString,
    pub workspace_id: Option<String>,
    pub version_date: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct InventoryConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub seed_path: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub static_dir: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct OrderingConfig {
    pub wait_time_minutes: u32,
    pub rejection_policy: RejectionPolicy,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub nlu_url: Option<String>,
    pub nlu_username: Option<String>,
    pub nlu_password: Option<String>,
    pub nlu_workspace_id: Option<String>,
    pub inventory_url: Option<String>,
    pub inventory_seed_path: Option<PathBuf>,
    pub server_port: Option<u16>,
    pub wait_time_minutes: Option<u32>,
    pub rejection_policy: Option<RejectionPolicy>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nlu: NluConfig {
                url: "https://gateway.watsonplatform.net/conversation/api".to_string(),
                username: String::new(),
                password: String::new().into(),
                workspace_id: None,
                version_date: "2016-07-11".to_string(),
                timeout_secs: 30,
            },
            inventory: InventoryConfig {
                url: None,
                username: None,
                password: None,
                seed_path: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
                static_dir: None,
            },
            ordering: OrderingConfig {
                wait_time_minutes: 10,
                rejection_policy: RejectionPolicy::PartialCommitOnReject,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl std::str::FromStr for RejectionPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "partial_commit" | "partial_commit_on_reject" => Ok(Self::PartialCommitOnReject),
            "atomic" => Ok(Self::Atomic),
            other => Err(ConfigError::Validation(format!(
                "unsupported rejection policy `{other}` (expected partial_commit|atomic)"
            ))),
        }
    }
}

impl NluConfig {
    /// The configured workspace id, ignoring blanks and the sample placeholder.
    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != WORKSPACE_PLACEHOLDER)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.expose_secret().trim().is_empty()
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("brewline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(nlu) = patch.nlu {
            if let Some(url) = nlu.url {
                self.nlu.url = url;
            }
            if let Some(username) = nlu.username {
                self.nlu.username = username;
            }
            if let Some(password) = nlu.password {
                self.nlu.password = secret_value(password);
            }
            if let Some(workspace_id) = nlu.workspace_id {
                self.nlu.workspace_id = Some(workspace_id);
            }
            if let Some(version_date) = nlu.version_date {
                self.nlu.version_date = version_date;
            }
            if let Some(timeout_secs) = nlu.timeout_secs {
                self.nlu.timeout_secs = timeout_secs;
            }
        }

        if let Some(inventory) = patch.inventory {
            if let Some(url) = inventory.url {
                self.inventory.url = Some(url);
            }
            if let Some(username) = inventory.username {
                self.inventory.username = Some(username);
            }
            if let Some(password) = inventory.password {
                self.inventory.password = Some(secret_value(password));
            }
            if let Some(seed_path) = inventory.seed_path {
                self.inventory.seed_path = Some(seed_path);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
            if let Some(static_dir) = server.static_dir {
                self.server.static_dir = Some(static_dir);
            }
        }

        if let Some(ordering) = patch.ordering {
            if let Some(wait_time_minutes) = ordering.wait_time_minutes {
                self.ordering.wait_time_minutes = wait_time_minutes;
            }
            if let Some(rejection_policy) = ordering.rejection_policy {
                self.ordering.rejection_policy = rejection_policy;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BREWLINE_NLU_URL") {
            self.nlu.url = value;
        }
        if let Some(value) =
            read_env("BREWLINE_NLU_USERNAME").or_else(|| read_env("CONVERSATION_USERNAME"))
        {
            self.nlu.username = value;
        }
        if let Some(value) =
            read_env("BREWLINE_NLU_PASSWORD").or_else(|| read_env("CONVERSATION_PASSWORD"))
        {
            self.nlu.password = secret_value(value);
        }
        if let Some(value) =
            read_env("BREWLINE_NLU_WORKSPACE_ID").or_else(|| read_env("WORKSPACE_ID"))
        {
            self.nlu.workspace_id = Some(value);
        }
        if let Some(value) = read_env("BREWLINE_NLU_VERSION_DATE") {
            self.nlu.version_date = value;
        }
        if let Some(value) = read_env("BREWLINE_NLU_TIMEOUT_SECS") {
            self.nlu.timeout_secs = parse_u64("BREWLINE_NLU_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BREWLINE_INVENTORY_URL") {
            self.inventory.url = Some(value);
        }
        if let Some(value) =
            read_env("BREWLINE_INVENTORY_USERNAME").or_else(|| read_env("NO_SQL_USERNAME"))
        {
            self.inventory.username = Some(value);
        }
        if let Some(value) =
            read_env("BREWLINE_INVENTORY_PASSWORD").or_else(|| read_env("NO_SQL_PASSWORD"))
        {
            self.inventory.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("BREWLINE_INVENTORY_SEED_PATH") {
            self.inventory.seed_path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("BREWLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("BREWLINE_SERVER_PORT") {
            self.server.port = parse_u16("BREWLINE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("BREWLINE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("BREWLINE_SERVER_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("BREWLINE_ORDERING_WAIT_TIME_MINUTES") {
            self.ordering.wait_time_minutes =
                parse_u32("BREWLINE_ORDERING_WAIT_TIME_MINUTES", &value)?;
        }
        if let Some(value) = read_env("BREWLINE_ORDERING_REJECTION_POLICY") {
            self.ordering.rejection_policy = value.parse()?;
        }

        let log_level =
            read_env("BREWLINE_LOGGING_LEVEL").or_else(|| read_env("BREWLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BREWLINE_LOGGING_FORMAT").or_else(|| read_env("BREWLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(nlu_url) = overrides.nlu_url {
            self.nlu.url = nlu_url;
        }
        if let Some(nlu_username) = overrides.nlu_username {
            self.nlu.username = nlu_username;
        }
        if let Some(nlu_password) = overrides.nlu_password {
            self.nlu.password = secret_value(nlu_password);
        }
        if let Some(workspace_id) = overrides.nlu_workspace_id {
            self.nlu.workspace_id = Some(workspace_id);
        }
        if let Some(inventory_url) = overrides.inventory_url {
            self.inventory.url = Some(inventory_url);
        }
        if let Some(seed_path) = overrides.inventory_seed_path {
            self.inventory.seed_path = Some(seed_path);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(wait_time_minutes) = overrides.wait_time_minutes {
            self.ordering.wait_time_minutes = wait_time_minutes;
        }
        if let Some(rejection_policy) = overrides.rejection_policy {
            self.ordering.rejection_policy = rejection_policy;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_nlu(&self.nlu)?;
        validate_inventory(&self.inventory)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("brewline.toml"), PathBuf::from("config/brewline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_nlu(nlu: &NluConfig) -> Result<(), ConfigError> {
    if !is_http_url(nlu.url.trim()) {
        return Err(ConfigError::Validation(
            "nlu.url must start with http:// or https://".to_string(),
        ));
    }

    if nlu.timeout_secs == 0 || nlu.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "nlu.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if nlu.version_date.trim().is_empty() {
        return Err(ConfigError::Validation(
            "nlu.version_date is required (for example `2016-07-11`)".to_string(),
        ));
    }

    Ok(())
}

fn validate_inventory(inventory: &InventoryConfig) -> Result<(), ConfigError> {
    if let Some(url) = &inventory.url {
        if !is_http_url(url.trim()) {
            return Err(ConfigError::Validation(
                "inventory.url must start with http:// or https://".to_string(),
            ));
        }
    }

    if inventory.password.is_some() && inventory.username.is_none() {
        return Err(ConfigError::Validation(
            "inventory.password is set but inventory.username is missing".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    nlu: Option<NluPatch>,
    inventory: Option<InventoryPatch>,
    server: Option<ServerPatch>,
    ordering: Option<OrderingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    workspace_id: Option<String>,
    version_date: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct InventoryPatch {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    seed_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct OrderingPatch {
    wait_time_minutes: Option<u32>,
    rejection_policy: Option<RejectionPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
