use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use bytes::Bytes;
use rdkafka_wrap::ClientConfig;
use rdkafka_wrap::config::RDKafkaLogLevel;
use rdkafka_wrap::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka_wrap::util::Timeout;
use serde::Serialize;

use super::provisioner::ProducerSettings;
use crate::error::{ProvisionError, ProvisionResult};
use crate::schema::{FormatRegistryClient, Schema, frame, key_subject, value_subject};
use crate::topic::TopicSpec;

const TARGET: &str = "kafka broker";

/// Producer bound to a single provisioned topic.
///
/// Keys (and values, when a value schema is given) are serialized with serde_json and
/// framed with the schema id assigned by the registry. The schemas are registered on
/// the first send.
///
/// Dropping a handle that was not closed flushes pending sends synchronously, which
/// blocks the current thread for up to the flush timeout. Inside a tokio task prefer
/// `close().await`, which flushes on the blocking pool.
pub struct ProducerHandle {
    spec: TopicSpec,
    settings: ProducerSettings,
    producer: FutureProducer,
    schemas: Arc<FormatRegistryClient>,
    key_schema: Schema,
    value_schema: Option<Schema>,
    last_millis: AtomicI64,
    closed: bool,
}

impl ProducerHandle {
    pub(crate) fn connect(
        spec: TopicSpec,
        settings: ProducerSettings,
        schemas: Arc<FormatRegistryClient>,
        key_schema: Schema,
        value_schema: Option<Schema>,
    ) -> ProvisionResult<Self> {
        let mut conf = ClientConfig::new();
        for (key, value) in &settings.extra {
            conf.set(key, value);
        }
        conf.set("bootstrap.servers", &settings.bootstrap_servers)
            .set("client.id", &settings.client_id)
            .set("acks", settings.acks.as_config_value())
            .set_log_level(RDKafkaLogLevel::Info);
        let producer: FutureProducer = conf
            .create()
            .map_err(|err| ProvisionError::transport(TARGET, err))?;
        wp_log::info_data!(
            "[kafka] producer {} ready for topic {} (acks={})",
            settings.client_id,
            spec.name,
            settings.acks.required_acks()
        );
        Ok(Self {
            spec,
            settings,
            producer,
            schemas,
            key_schema,
            value_schema,
            last_millis: AtomicI64::new(0),
            closed: false,
        })
    }

    pub fn spec(&self) -> &TopicSpec {
        &self.spec
    }

    pub fn settings(&self) -> &ProducerSettings {
        &self.settings
    }

    /// Wall-clock milliseconds for event keys, strictly increasing per handle.
    pub fn time_millis(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let next = |prev: i64| now.max(prev + 1);
        match self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| Some(next(prev)))
        {
            Ok(prev) | Err(prev) => next(prev),
        }
    }

    async fn encode_key<K: Serialize + ?Sized>(&self, key: &K) -> ProvisionResult<Bytes> {
        let payload = serde_json::to_vec(key)?;
        let id = self
            .schemas
            .register(&key_subject(&self.spec.name), &self.key_schema)
            .await?;
        Ok(frame(id, &payload))
    }

    async fn encode_value<V: Serialize + ?Sized>(&self, value: &V) -> ProvisionResult<Bytes> {
        let payload = serde_json::to_vec(value)?;
        match &self.value_schema {
            Some(schema) => {
                let id = self
                    .schemas
                    .register(&value_subject(&self.spec.name), schema)
                    .await?;
                Ok(frame(id, &payload))
            }
            None => Ok(Bytes::from(payload)),
        }
    }

    pub async fn send<K, V>(&self, key: &K, value: Option<&V>) -> ProvisionResult<()>
    where
        K: Serialize + ?Sized,
        V: Serialize + ?Sized,
    {
        let key = self.encode_key(key).await?;
        let value = match value {
            Some(value) => Some(self.encode_value(value).await?),
            None => None,
        };

        let mut record: FutureRecord<'_, [u8], [u8]> =
            FutureRecord::to(&self.spec.name).key(key.as_ref());
        if let Some(value) = &value {
            record = record.payload(value.as_ref());
        }
        self.producer
            .send(record, Timeout::After(self.settings.flush_timeout))
            .await
            .map(|_| ())
            .map_err(|(err, _)| ProvisionError::DeliveryFailed {
                topic: self.spec.name.clone(),
                reason: err.to_string(),
            })
    }

    /// Waits for in-flight sends to be acknowledged.
    pub async fn flush(&self) -> ProvisionResult<()> {
        let producer = self.producer.clone();
        let timeout = self.settings.flush_timeout;
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|err| ProvisionError::transport(TARGET, err))?
            .map_err(|err| ProvisionError::transport(TARGET, err))
    }

    pub async fn close(mut self) -> ProvisionResult<()> {
        self.closed = true;
        self.flush().await?;
        log::debug!("[kafka] producer {} closed", self.settings.client_id);
        Ok(())
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self
            .producer
            .flush(Timeout::After(self.settings.flush_timeout))
        {
            wp_log::error_data!(
                "[kafka] producer {} flush on drop failed: {}",
                self.settings.client_id,
                err
            );
        }
    }
}
