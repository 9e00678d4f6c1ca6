use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::admin::{KafkaTopicAdmin, TopicAdmin, TopicCreation};
use super::producer::ProducerHandle;
use super::registry::ProvisioningRegistry;
use crate::config::{BootstrapConf, BrokerConf};
use crate::error::ProvisionResult;
use crate::schema::{FormatRegistryClient, Schema};
use crate::topic::{AckPolicy, TopicSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    /// The topic was already present on the broker.
    Existing,
    Created,
}

/// Connection properties derived for a topic's producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSettings {
    pub bootstrap_servers: String,
    pub client_id: String,
    pub acks: AckPolicy,
    pub flush_timeout: Duration,
    /// Extra librdkafka properties from `broker.config`.
    pub extra: Vec<(String, String)>,
}

/// Creates topics at most once per process and hands out producers bound to them.
pub struct Provisioner {
    broker: BrokerConf,
    admin: Arc<dyn TopicAdmin>,
    registry: Arc<ProvisioningRegistry>,
    schemas: Arc<FormatRegistryClient>,
}

impl Provisioner {
    pub fn new(
        broker: BrokerConf,
        admin: Arc<dyn TopicAdmin>,
        registry: Arc<ProvisioningRegistry>,
        schemas: Arc<FormatRegistryClient>,
    ) -> Self {
        Self {
            broker,
            admin,
            registry,
            schemas,
        }
    }

    /// Wires a librdkafka admin client and a registry client from configuration.
    pub fn from_conf(
        conf: &BootstrapConf,
        registry: Arc<ProvisioningRegistry>,
    ) -> ProvisionResult<Self> {
        let admin = KafkaTopicAdmin::new(&conf.broker)?;
        let schemas = FormatRegistryClient::new(&conf.registry)?;
        Ok(Self::new(
            conf.broker.clone(),
            Arc::new(admin),
            registry,
            Arc::new(schemas),
        ))
    }

    pub fn registry(&self) -> &Arc<ProvisioningRegistry> {
        &self.registry
    }

    /// Makes sure the topic exists on the broker, creating it when the broker
    /// reports it unknown.
    pub async fn ensure_topic(&self, spec: &TopicSpec) -> ProvisionResult<TopicStatus> {
        spec.check()?;
        let mut provisioned = self.registry.lock().await;
        self.ensure_topic_locked(&mut provisioned, spec).await
    }

    async fn ensure_topic_locked(
        &self,
        provisioned: &mut HashSet<String>,
        spec: &TopicSpec,
    ) -> ProvisionResult<TopicStatus> {
        if self.admin.topic_exists(&spec.name).await? {
            if provisioned.insert(spec.name.clone()) {
                log::debug!("[kafka] topic {} already present", spec.name);
            }
            return Ok(TopicStatus::Existing);
        }

        wp_log::info_data!(
            "[kafka] creating topic {} (partitions={}, replication={})",
            spec.name,
            spec.num_partitions,
            spec.replication
        );
        let status = match self.admin.create_topic(spec).await {
            Ok(TopicCreation::Created) => {
                wp_log::info_data!("[kafka] topic '{}' creation successful", spec.name);
                TopicStatus::Created
            }
            Ok(TopicCreation::AlreadyExists) => {
                wp_log::warn_data!("[kafka] topic {} already exists, continuing", spec.name);
                TopicStatus::Existing
            }
            Err(err) => {
                wp_log::error_data!("[kafka] topic {} creation failed: {}", spec.name, err);
                return Err(err);
            }
        };
        provisioned.insert(spec.name.clone());
        Ok(status)
    }

    pub fn producer_settings(&self, spec: &TopicSpec) -> ProducerSettings {
        ProducerSettings {
            bootstrap_servers: self.broker.brokers.clone(),
            client_id: spec.client_id(),
            acks: spec.ack_policy(),
            flush_timeout: self.broker.flush_timeout(),
            extra: self.broker.config_pairs(),
        }
    }

    /// Returns a producer for `spec`, provisioning the topic first unless this
    /// process already did.
    pub async fn get_or_create_producer(
        &self,
        spec: &TopicSpec,
        key_schema: Schema,
        value_schema: Option<Schema>,
    ) -> ProvisionResult<ProducerHandle> {
        spec.check()?;
        {
            let mut provisioned = self.registry.lock().await;
            if provisioned.contains(&spec.name) {
                log::debug!("[kafka] topic {} already provisioned", spec.name);
            } else {
                self.ensure_topic_locked(&mut provisioned, spec).await?;
            }
        }
        ProducerHandle::connect(
            spec.clone(),
            self.producer_settings(spec),
            Arc::clone(&self.schemas),
            key_schema,
            value_schema,
        )
    }
}
