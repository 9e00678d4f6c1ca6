use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tokio::sync::Mutex;

use super::config::ConnectorConfig;
use crate::config::ConnectConf;
use crate::error::{ProvisionError, ProvisionResult};
use wp_conf_base::structure::Validate;

const TARGET: &str = "connect runtime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Lookup found the connector (or the runtime answered 409 to the create request).
    AlreadyRegistered,
    Created,
}

#[derive(Serialize)]
struct CreateConnector<'a> {
    name: &'a str,
    config: BTreeMap<String, String>,
}

/// Registers JDBC source connectors with the Kafka Connect REST API.
///
/// One lookup per call; a create request is only sent when the lookup does not
/// answer 200. Calls on the same registrar are serialized.
pub struct ConnectorRegistrar {
    base_url: String,
    client: reqwest::Client,
    states: Mutex<HashMap<String, RegistrationState>>,
}

impl ConnectorRegistrar {
    pub fn new(conf: &ConnectConf) -> ProvisionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(conf.timeout_ms))
            .build()
            .map_err(|err| ProvisionError::transport(TARGET, err))?;
        Ok(Self::with_client(conf.url.as_str(), client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            states: Mutex::new(HashMap::new()),
        }
    }

    fn connectors_url(&self) -> String {
        format!("{}/connectors", self.base_url)
    }

    pub async fn state(&self, name: &str) -> RegistrationState {
        self.states
            .lock()
            .await
            .get(name)
            .copied()
            .unwrap_or(RegistrationState::Unregistered)
    }

    pub async fn ensure_connector_registered(
        &self,
        config: &ConnectorConfig,
    ) -> ProvisionResult<RegistrationOutcome> {
        config.validate().map_err(ProvisionError::invalid)?;
        let mut states = self.states.lock().await;

        log::debug!("[connect] looking up connector {}", config.name);
        let lookup_url = format!(
            "{}/{}",
            self.connectors_url(),
            urlencoding::encode(&config.name)
        );
        let lookup = self
            .client
            .get(&lookup_url)
            .send()
            .await
            .map_err(|err| ProvisionError::transport(TARGET, err))?;
        if lookup.status() == StatusCode::OK {
            log::debug!("[connect] connector {} already registered", config.name);
            states.insert(config.name.clone(), RegistrationState::Registered);
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        wp_log::info_data!(
            "[connect] connector {} not found ({}), creating",
            config.name,
            lookup.status()
        );
        let body = serde_json::to_vec(&CreateConnector {
            name: &config.name,
            config: config.to_config_map(),
        })?;
        let resp = self
            .client
            .post(self.connectors_url())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| ProvisionError::transport(TARGET, err))?;

        let status = resp.status();
        let outcome = if status.is_success() {
            wp_log::info_data!("[connect] connector {} created", config.name);
            RegistrationOutcome::Created
        } else if status == StatusCode::CONFLICT {
            wp_log::warn_data!(
                "[connect] connector {} created concurrently, continuing",
                config.name
            );
            RegistrationOutcome::AlreadyRegistered
        } else {
            let body = resp.text().await.unwrap_or_default();
            wp_log::error_data!(
                "[connect] connector {} registration failed: {} {}",
                config.name,
                status,
                body
            );
            return Err(ProvisionError::ConnectorRegistrationFailed {
                name: config.name.clone(),
                status,
                body,
            });
        };
        states.insert(config.name.clone(), RegistrationState::Registered);
        Ok(outcome)
    }
}
