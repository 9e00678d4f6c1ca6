//! Kafka：topic 幂等供给 + Producer 构建
//!
//! 模块划分：
//! - admin：TopicAdmin 抽象与基于 librdkafka 的 KafkaTopicAdmin（元数据探测/建 Topic）
//! - registry：ProvisioningRegistry（进程内已供给 topic 账本）
//! - provisioner：Provisioner（ensure_topic / get_or_create_producer）
//! - producer：ProducerHandle（schema 封装发送、flush-on-close）

mod admin;
mod producer;
mod provisioner;
mod registry;

pub use admin::{KafkaTopicAdmin, TopicAdmin, TopicCreation};
pub use producer::ProducerHandle;
pub use provisioner::{ProducerSettings, Provisioner, TopicStatus};
pub use registry::ProvisioningRegistry;
