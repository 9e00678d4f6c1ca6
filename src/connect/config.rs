use std::collections::BTreeMap;

use educe::Educe;
use orion_conf::error::{ConfIOReason, OrionConfResult};
use orion_error::{ToStructError, UvsFrom};
use serde::{Deserialize, Serialize};
use wp_conf_base::structure::Validate;

/// JDBC source `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum IngestMode {
    #[serde(rename = "bulk")]
    Bulk,
    #[default]
    #[serde(rename = "incrementing")]
    Incrementing,
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "timestamp+incrementing")]
    TimestampIncrementing,
}

impl IngestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestMode::Bulk => "bulk",
            IngestMode::Incrementing => "incrementing",
            IngestMode::Timestamp => "timestamp",
            IngestMode::TimestampIncrementing => "timestamp+incrementing",
        }
    }

    fn uses_incrementing_column(&self) -> bool {
        matches!(
            self,
            IngestMode::Incrementing | IngestMode::TimestampIncrementing
        )
    }

    fn uses_timestamp_column(&self) -> bool {
        matches!(
            self,
            IngestMode::Timestamp | IngestMode::TimestampIncrementing
        )
    }
}

/// JDBC source connector registered with Kafka Connect.
#[derive(Educe, Deserialize, Serialize, PartialEq, Clone)]
#[educe(Debug, Default)]
#[serde(default)]
pub struct ConnectorConfig {
    #[educe(Default = "stations")]
    pub name: String,
    #[educe(Default = "io.confluent.connect.jdbc.JdbcSourceConnector")]
    pub connector_class: String,
    #[educe(Default = "org.apache.kafka.connect.json.JsonConverter")]
    pub key_converter: String,
    #[educe(Default = "org.apache.kafka.connect.json.JsonConverter")]
    pub value_converter: String,
    pub schemas_enable: bool,
    #[educe(Default = 500)]
    pub batch_max_rows: u32,
    #[educe(Default = "jdbc:postgresql://localhost:5432/cta")]
    pub connection_url: String,
    #[educe(Default = "cta_admin")]
    pub connection_user: String,
    #[educe(Debug(ignore))]
    pub connection_password: String,
    #[educe(Default = "stations")]
    pub table_whitelist: String,
    pub mode: IngestMode,
    #[educe(Default(expression = Some("stop_id".to_string())))]
    pub incrementing_column: Option<String>,
    pub timestamp_column: Option<String>,
    #[educe(Default = "producer-connector-")]
    pub topic_prefix: String,
    #[educe(Default = 15_000)]
    pub poll_interval_ms: u64,
}

impl ConnectorConfig {
    /// Flat `config` map of the Kafka Connect REST payload.
    pub fn to_config_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let schemas_enable = self.schemas_enable.to_string();
        map.insert("connector.class".into(), self.connector_class.clone());
        map.insert("key.converter".into(), self.key_converter.clone());
        map.insert("key.converter.schemas.enable".into(), schemas_enable.clone());
        map.insert("value.converter".into(), self.value_converter.clone());
        map.insert("value.converter.schemas.enable".into(), schemas_enable);
        map.insert("batch.max.rows".into(), self.batch_max_rows.to_string());
        map.insert("connection.url".into(), self.connection_url.clone());
        map.insert("connection.user".into(), self.connection_user.clone());
        map.insert("connection.password".into(), self.connection_password.clone());
        map.insert("table.whitelist".into(), self.table_whitelist.clone());
        map.insert("mode".into(), self.mode.as_str().to_string());
        if self.mode.uses_incrementing_column()
            && let Some(column) = &self.incrementing_column
        {
            map.insert("incrementing.column.name".into(), column.clone());
        }
        if self.mode.uses_timestamp_column()
            && let Some(column) = &self.timestamp_column
        {
            map.insert("timestamp.column.name".into(), column.clone());
        }
        map.insert("topic.prefix".into(), self.topic_prefix.clone());
        map.insert("poll.interval.ms".into(), self.poll_interval_ms.to_string());
        map
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

impl Validate for ConnectorConfig {
    fn validate(&self) -> OrionConfResult<()> {
        if self.name.trim().is_empty() {
            return ConfIOReason::from_validation("connector.name must not be empty").err_result();
        }
        if self.connector_class.trim().is_empty() {
            return ConfIOReason::from_validation("connector.connector_class must not be empty")
                .err_result();
        }
        if self.connection_url.trim().is_empty() {
            return ConfIOReason::from_validation("connector.connection_url must not be empty")
                .err_result();
        }
        if self.table_whitelist.trim().is_empty() {
            return ConfIOReason::from_validation("connector.table_whitelist must not be empty")
                .err_result();
        }
        if self.batch_max_rows == 0 {
            return ConfIOReason::from_validation("connector.batch_max_rows must be > 0")
                .err_result();
        }
        if self.poll_interval_ms == 0 {
            return ConfIOReason::from_validation("connector.poll_interval_ms must be > 0")
                .err_result();
        }
        if self.mode.uses_incrementing_column() && blank(&self.incrementing_column) {
            return ConfIOReason::from_validation(
                "connector.incrementing_column is required by the configured mode",
            )
            .err_result();
        }
        if self.mode.uses_timestamp_column() && blank(&self.timestamp_column) {
            return ConfIOReason::from_validation(
                "connector.timestamp_column is required by the configured mode",
            )
            .err_result();
        }
        Ok(())
    }
}
