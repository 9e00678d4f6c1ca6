//! Bootstrap helpers for a Kafka based pipeline: idempotent topic provisioning,
//! schema-aware producers and Kafka Connect source registration.

pub mod config;
pub mod error;
pub mod schema;
pub mod topic;

// Kafka：默认启用（feature = "kafka" 是默认特性）
#[cfg(feature = "kafka")]
pub mod kafka;

// Kafka Connect：默认启用（feature = "connect" 是默认特性）
#[cfg(feature = "connect")]
pub mod connect;

pub use config::BootstrapConf;
pub use error::{ProvisionError, ProvisionResult};
pub use topic::{AckPolicy, TopicSpec};
