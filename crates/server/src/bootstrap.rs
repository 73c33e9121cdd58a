use std::sync::Arc;
use std::time::Duration;

use brewline_agent::nlu::NluClient;
use brewline_agent::runtime::{AgentRuntime, RuntimeSettings};
use brewline_core::audit::AuditSink;
use brewline_core::config::{AppConfig, ConfigError, LoadOptions};
use thiserror::Error;
use tracing::{info, warn};

use crate::audit_sink::TracingAuditSink;
use crate::inventory_source::{
    source_from_config, InventoryLoadStatus, InventoryLoadTracker, InventorySource,
};
use crate::nlu_client::HttpNluClient;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
    pub nlu: Arc<dyn NluClient>,
    pub inventory_source: Option<Arc<dyn InventorySource>>,
    pub inventory_load: InventoryLoadTracker,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    if !config.nlu.has_credentials() {
        warn!(
            event_name = "system.bootstrap.nlu_credentials_missing",
            correlation_id = "bootstrap",
            "nlu username/password are not set; calls to the nlu service will be rejected"
        );
    }
    if config.nlu.workspace_id().is_none() {
        warn!(
            event_name = "system.bootstrap.workspace_missing",
            correlation_id = "bootstrap",
            "nlu workspace id is not set; every turn will return the configuration notice"
        );
    }

    let nlu = HttpNluClient::from_config(&config.nlu).map_err(BootstrapError::HttpClient)?;
    let inventory_source =
        source_from_config(&config.inventory, Duration::from_secs(config.nlu.timeout_secs))
            .map_err(BootstrapError::HttpClient)?;
    let inventory_load = InventoryLoadTracker::new(match inventory_source {
        Some(_) => InventoryLoadStatus::Pending,
        None => InventoryLoadStatus::NotConfigured,
    });

    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let runtime =
        Arc::new(AgentRuntime::new(RuntimeSettings::from(&config.ordering), audit.clone()));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        rejection_policy = ?config.ordering.rejection_policy,
        wait_time_minutes = config.ordering.wait_time_minutes,
        "application components constructed"
    );

    Ok(Application {
        config,
        runtime,
        nlu: Arc::new(nlu),
        inventory_source,
        inventory_load,
        audit,
    })
}

#[cfg(test)]
mod tests {
    use brewline_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use brewline_core::domain::order::RejectionPolicy;

    use crate::bootstrap::{bootstrap, bootstrap_with_config, BootstrapError};
    use crate::inventory_source::InventoryLoadStatus;

    #[test]
    fn bootstrap_fails_fast_on_invalid_nlu_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                nlu_url: Some("ftp://nlu.example.test".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let Err(BootstrapError::Config(error)) = result else {
            panic!("expected a config error");
        };
        assert!(error.to_string().contains("nlu.url"));
    }

    #[test]
    fn bootstrap_without_sources_leaves_inventory_unconfigured() {
        let app = bootstrap_with_config(AppConfig::default()).expect("bootstrap succeeds");

        assert!(app.inventory_source.is_none());
        assert_eq!(app.inventory_load.status(), InventoryLoadStatus::NotConfigured);
        assert!(!app.runtime.is_seeded());
    }

    #[test]
    fn bootstrap_applies_ordering_settings() {
        let mut config = AppConfig::default();
        config.ordering.wait_time_minutes = 25;
        config.ordering.rejection_policy = RejectionPolicy::Atomic;
        config.inventory.seed_path = Some("seed.json".into());

        let app = bootstrap_with_config(config).expect("bootstrap succeeds");

        assert_eq!(app.runtime.settings().wait_time_minutes, 25);
        assert_eq!(app.runtime.settings().rejection_policy, RejectionPolicy::Atomic);
        assert_eq!(app.inventory_load.status(), InventoryLoadStatus::Pending);
        assert!(app.inventory_source.is_some());
    }
}
