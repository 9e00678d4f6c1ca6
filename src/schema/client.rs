use std::collections::HashMap;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{SCHEMA_TYPE, Schema};
use crate::config::RegistryConf;
use crate::error::{ProvisionError, ProvisionResult};

pub const MAGIC_BYTE: u8 = 0;
const REGISTRY_CONTENT_TYPE: &str = "application/vnd.schemaregistry.v1+json";
const TARGET: &str = "schema registry";

#[derive(Serialize)]
struct RegisterRequest<'a> {
    schema: &'a str,
    #[serde(rename = "schemaType")]
    schema_type: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: u32,
}

/// Registry client shared by every producer handle of a process.
///
/// Schema ids are cached per (subject, schema text): a schema is posted at most once
/// per client instance, while a different schema under the same subject is registered
/// as a new version.
pub struct FormatRegistryClient {
    base_url: String,
    client: reqwest::Client,
    ids: RwLock<HashMap<(String, String), u32>>,
}

impl FormatRegistryClient {
    pub fn new(conf: &RegistryConf) -> ProvisionResult<Self> {
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
            ids: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn cached_id(&self, subject: &str, schema: &Schema) -> Option<u32> {
        self.ids
            .read()
            .await
            .get(&(subject.to_string(), schema.definition().to_string()))
            .copied()
    }

    /// Registers `schema` under `subject` and returns the registry-assigned id.
    pub async fn register(&self, subject: &str, schema: &Schema) -> ProvisionResult<u32> {
        if let Some(id) = self.cached_id(subject, schema).await {
            return Ok(id);
        }

        let url = format!(
            "{}/subjects/{}/versions",
            self.base_url,
            urlencoding::encode(subject)
        );
        let body = serde_json::to_vec(&RegisterRequest {
            schema: schema.definition(),
            schema_type: SCHEMA_TYPE,
        })?;
        let resp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, REGISTRY_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| ProvisionError::transport(TARGET, err))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            wp_log::error_data!("[schema] register subject {} failed: {} {}", subject, status, body);
            return Err(ProvisionError::SchemaRegistrationFailed {
                subject: subject.to_string(),
                status,
                body,
            });
        }

        let registered: RegisterResponse = resp
            .json()
            .await
            .map_err(|err| ProvisionError::transport(TARGET, err))?;
        log::debug!("[schema] subject {} registered with id {}", subject, registered.id);
        let mut ids = self.ids.write().await;
        Ok(*ids
            .entry((subject.to_string(), schema.definition().to_string()))
            .or_insert(registered.id))
    }
}

/// Registry wire format: magic byte, big-endian schema id, payload.
pub fn frame(schema_id: u32, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 5);
    buf.put_u8(MAGIC_BYTE);
    buf.put_u32(schema_id);
    buf.put_slice(payload);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const STATION_SCHEMA: &str = r#"{"type":"object","properties":{"station_id":{"type":"integer"}}}"#;

    #[test]
    fn frame_prefixes_magic_byte_and_big_endian_id() {
        let framed = frame(0x0102_0304, b"{}");
        assert_eq!(framed.as_ref(), &[0, 1, 2, 3, 4, b'{', b'}']);
    }

    #[tokio::test]
    async fn register_posts_once_and_caches_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/subjects/stations-value/versions")
                    .header("content-type", REGISTRY_CONTENT_TYPE)
                    .json_body(json!({"schema": STATION_SCHEMA, "schemaType": "JSON"}));
                then.status(200).json_body(json!({"id": 42}));
            })
            .await;

        let client = FormatRegistryClient::with_client(&server.base_url(), reqwest::Client::new());
        let schema = Schema::new(STATION_SCHEMA);
        assert_eq!(client.register("stations-value", &schema).await.unwrap(), 42);
        assert_eq!(client.register("stations-value", &schema).await.unwrap(), 42);
        assert_eq!(client.cached_id("stations-value", &schema).await, Some(42));
        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn rejected_registration_is_reported_with_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/subjects/stations-key/versions");
                then.status(422).body("invalid schema");
            })
            .await;

        let client = FormatRegistryClient::with_client(&server.base_url(), reqwest::Client::new());
        let err = client
            .register("stations-key", &Schema::new("{"))
            .await
            .expect_err("registry rejects schema");
        match err {
            ProvisionError::SchemaRegistrationFailed {
                subject,
                status,
                body,
            } => {
                assert_eq!(subject, "stations-key");
                assert_eq!(status.as_u16(), 422);
                assert_eq!(body, "invalid schema");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            client.cached_id("stations-key", &Schema::new("{")).await,
            None
        );
    }

    #[tokio::test]
    async fn new_schema_under_known_subject_gets_its_own_id() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/subjects/events-value/versions")
                    .json_body(json!({"schema": STATION_SCHEMA, "schemaType": "JSON"}));
                then.status(200).json_body(json!({"id": 1}));
            })
            .await;
        let arrival = r#"{"type":"object","properties":{"train_id":{"type":"string"}}}"#;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/subjects/events-value/versions")
                    .json_body(json!({"schema": arrival, "schemaType": "JSON"}));
                then.status(200).json_body(json!({"id": 2}));
            })
            .await;

        let client = FormatRegistryClient::with_client(&server.base_url(), reqwest::Client::new());
        let station = Schema::new(STATION_SCHEMA);
        let arrival = Schema::new(arrival);
        assert_eq!(client.register("events-value", &station).await.unwrap(), 1);
        assert_eq!(client.register("events-value", &arrival).await.unwrap(), 2);
        assert_eq!(client.register("events-value", &station).await.unwrap(), 1);
        assert_eq!(client.register("events-value", &arrival).await.unwrap(), 2);
        first.assert_hits_async(1).await;
        second.assert_hits_async(1).await;
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client =
            FormatRegistryClient::with_client("http://registry:8081/", reqwest::Client::new());
        assert_eq!(client.base_url(), "http://registry:8081");
    }

    #[tokio::test]
    async fn unreachable_registry_is_a_transport_error() {
        let client = FormatRegistryClient::with_client("http://127.0.0.1:1", reqwest::Client::new());
        let err = client
            .register("stations-key", &Schema::new("{}"))
            .await
            .expect_err("nothing listens on port 1");
        assert!(matches!(err, ProvisionError::Transport { .. }));
    }
}
