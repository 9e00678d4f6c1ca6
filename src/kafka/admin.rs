use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rdkafka_wrap::ClientConfig;
use rdkafka_wrap::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka_wrap::client::DefaultClientContext;
use rdkafka_wrap::config::RDKafkaLogLevel;
use rdkafka_wrap::error::{KafkaError, KafkaResult};
use rdkafka_wrap::types::RDKafkaErrorCode;

use crate::config::BrokerConf;
use crate::error::{ProvisionError, ProvisionResult};
use crate::topic::TopicSpec;

const TARGET: &str = "kafka broker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicCreation {
    Created,
    /// The broker already had the topic when the create request arrived.
    AlreadyExists,
}

/// Broker control plane used by the provisioner.
#[async_trait]
pub trait TopicAdmin: Send + Sync {
    /// `Ok(false)` only when the broker explicitly reports the topic as unknown.
    async fn topic_exists(&self, name: &str) -> ProvisionResult<bool>;

    async fn create_topic(&self, spec: &TopicSpec) -> ProvisionResult<TopicCreation>;
}

pub struct KafkaTopicAdmin {
    admin: Arc<AdminClient<DefaultClientContext>>,
    timeout: Duration,
}

impl KafkaTopicAdmin {
    pub fn new(conf: &BrokerConf) -> ProvisionResult<Self> {
        let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &conf.brokers)
            .set_log_level(RDKafkaLogLevel::Info)
            .create()
            .map_err(|err| ProvisionError::transport(TARGET, err))?;
        Ok(Self {
            admin: Arc::new(admin),
            timeout: conf.request_timeout(),
        })
    }
}

#[async_trait]
impl TopicAdmin for KafkaTopicAdmin {
    async fn topic_exists(&self, name: &str) -> ProvisionResult<bool> {
        let admin = Arc::clone(&self.admin);
        let topic = name.to_string();
        let timeout = self.timeout;
        // metadata 请求是阻塞调用，放到 blocking 线程池
        let lookup = tokio::task::spawn_blocking(
            move || -> KafkaResult<Option<Option<RDKafkaErrorCode>>> {
                let metadata = admin.inner().fetch_metadata(Some(topic.as_str()), timeout)?;
                Ok(metadata
                    .topics()
                    .iter()
                    .find(|t| t.name() == topic)
                    .map(|t| t.error().map(RDKafkaErrorCode::from)))
            },
        )
        .await
        .map_err(|err| ProvisionError::transport(TARGET, err))?
        .map_err(|err| ProvisionError::transport(TARGET, err))?;

        match lookup {
            None => Ok(false),
            Some(code) => probe_outcome(code),
        }
    }

    async fn create_topic(&self, spec: &TopicSpec) -> ProvisionResult<TopicCreation> {
        let new_topic = NewTopic::new(
            &spec.name,
            spec.num_partitions,
            TopicReplication::Fixed(spec.replication),
        );
        let opts = AdminOptions::new().operation_timeout(Some(self.timeout));
        let results = self
            .admin
            .create_topics::<Vec<&NewTopic>>(vec![&new_topic], &opts)
            .await
            .map_err(|err| ProvisionError::CreationFailed {
                topic: spec.name.clone(),
                reason: err.to_string(),
            })?;
        creation_outcome(&spec.name, results)
    }
}

/// Maps the per-topic metadata error to presence.
///
/// A missing leader still means the topic exists; anything other than an
/// unknown-topic answer is surfaced instead of being read as absence.
fn probe_outcome(code: Option<RDKafkaErrorCode>) -> ProvisionResult<bool> {
    match code {
        None | Some(RDKafkaErrorCode::LeaderNotAvailable) => Ok(true),
        Some(RDKafkaErrorCode::UnknownTopicOrPartition) | Some(RDKafkaErrorCode::UnknownTopic) => {
            Ok(false)
        }
        Some(code) => Err(ProvisionError::transport(
            TARGET,
            KafkaError::MetadataFetch(code),
        )),
    }
}

fn creation_outcome(topic: &str, results: Vec<TopicResult>) -> ProvisionResult<TopicCreation> {
    let Some(result) = results.into_iter().next() else {
        return Err(ProvisionError::CreationFailed {
            topic: topic.to_string(),
            reason: "broker returned no result".to_string(),
        });
    };
    match result {
        Ok(_) => Ok(TopicCreation::Created),
        Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(TopicCreation::AlreadyExists),
        Err((name, code)) => Err(ProvisionError::CreationFailed {
            topic: name,
            reason: code.to_string(),
        }),
    }
}
