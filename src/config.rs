//! 启动配置：broker / schema registry / Kafka Connect 端点与待供给的 topic 列表。
//!
//! 所有端点、凭据与表名都来自配置文件（TOML），缺省值指向本地开发环境。

use std::path::Path;
use std::time::Duration;

use educe::Educe;
use orion_conf::error::{ConfIOReason, OrionConfResult};
use orion_error::{ToStructError, UvsFrom};
use serde::{Deserialize, Serialize};
use wp_conf_base::structure::Validate;

#[cfg(feature = "connect")]
use crate::connect::ConnectorConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::topic::TopicSpec;

#[derive(Educe, Deserialize, Serialize, PartialEq, Clone)]
#[educe(Debug, Default)]
#[serde(default)]
pub struct BrokerConf {
    #[educe(Default = "PLAINTEXT://localhost:9092")]
    pub brokers: String,
    #[educe(Default = 10_000)]
    pub request_timeout_ms: u64,
    #[educe(Default = 3_000)]
    pub flush_timeout_ms: u64,
    /// Extra librdkafka producer properties, `key = value` per entry.
    pub config: Option<Vec<String>>,
}

impl BrokerConf {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    /// Splits `config` entries on the first `=`; malformed entries are skipped.
    pub fn config_pairs(&self) -> Vec<(String, String)> {
        let Some(items) = &self.config else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| item.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, _)| !k.is_empty())
            .collect()
    }
}

impl Validate for BrokerConf {
    fn validate(&self) -> OrionConfResult<()> {
        if self.brokers.trim().is_empty() {
            return ConfIOReason::from_validation("broker.brokers must not be empty").err_result();
        }
        if self.request_timeout_ms == 0 {
            return ConfIOReason::from_validation("broker.request_timeout_ms must be > 0")
                .err_result();
        }
        Ok(())
    }
}

#[derive(Educe, Deserialize, Serialize, PartialEq, Clone)]
#[educe(Debug, Default)]
#[serde(default)]
pub struct RegistryConf {
    #[educe(Default = "http://localhost:8081")]
    pub url: String,
    #[educe(Default = 10_000)]
    pub timeout_ms: u64,
}

impl Validate for RegistryConf {
    fn validate(&self) -> OrionConfResult<()> {
        if self.url.trim().is_empty() {
            return ConfIOReason::from_validation("registry.url must not be empty").err_result();
        }
        Ok(())
    }
}

#[derive(Educe, Deserialize, Serialize, PartialEq, Clone)]
#[educe(Debug, Default)]
#[serde(default)]
pub struct ConnectConf {
    #[educe(Default = "http://localhost:8083")]
    pub url: String,
    #[educe(Default = 10_000)]
    pub timeout_ms: u64,
}

impl Validate for ConnectConf {
    fn validate(&self) -> OrionConfResult<()> {
        if self.url.trim().is_empty() {
            return ConfIOReason::from_validation("connect.url must not be empty").err_result();
        }
        Ok(())
    }
}

/// Top level configuration file.
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct BootstrapConf {
    pub broker: BrokerConf,
    pub registry: RegistryConf,
    pub connect: ConnectConf,
    #[cfg(feature = "connect")]
    pub connector: ConnectorConfig,
    pub topics: Vec<TopicSpec>,
}

impl BootstrapConf {
    pub fn from_toml(raw: &str) -> ProvisionResult<Self> {
        let conf: Self = toml::from_str(raw).map_err(ProvisionError::invalid)?;
        conf.check()?;
        Ok(conf)
    }

    pub fn load(path: &Path) -> ProvisionResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ProvisionError::InvalidConfig(format!("read {} failed: {err}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    /// Runs [`Validate`] and maps the outcome into [`ProvisionError`].
    pub fn check(&self) -> ProvisionResult<()> {
        self.validate().map_err(ProvisionError::invalid)
    }
}

impl Validate for BootstrapConf {
    fn validate(&self) -> OrionConfResult<()> {
        self.broker.validate()?;
        self.registry.validate()?;
        self.connect.validate()?;
        #[cfg(feature = "connect")]
        self.connector.validate()?;
        for topic in &self.topics {
            topic.validate()?;
        }
        Ok(())
    }
}
