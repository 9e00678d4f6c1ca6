use orion_conf::error::{ConfIOReason, OrionConfResult};
use orion_error::{ToStructError, UvsFrom};
use serde::{Deserialize, Serialize};
use wp_conf_base::structure::Validate;

use crate::error::{ProvisionError, ProvisionResult};

pub const CLIENT_ID_PREFIX: &str = "producer_client_id_";

/// Desired shape of a topic: name, partition count and replication factor.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct TopicSpec {
    pub name: String,
    #[serde(default = "default_one")]
    pub num_partitions: i32,
    #[serde(default = "default_one")]
    pub replication: i32,
}

fn default_one() -> i32 {
    1
}

impl TopicSpec {
    pub fn new(name: &str, num_partitions: i32, replication: i32) -> Self {
        Self {
            name: name.to_string(),
            num_partitions,
            replication,
        }
    }

    pub fn ack_policy(&self) -> AckPolicy {
        AckPolicy::from_replication(self.replication)
    }

    /// `producer_client_id_` followed by the topic name with every whitespace character removed.
    pub fn client_id(&self) -> String {
        let compact: String = self.name.chars().filter(|c| !c.is_whitespace()).collect();
        format!("{CLIENT_ID_PREFIX}{compact}")
    }

    pub(crate) fn check(&self) -> ProvisionResult<()> {
        self.validate().map_err(ProvisionError::invalid)
    }
}

impl Validate for TopicSpec {
    fn validate(&self) -> OrionConfResult<()> {
        if self.name.trim().is_empty() {
            return ConfIOReason::from_validation("topic.name must not be empty").err_result();
        }
        if self.num_partitions < 1 {
            return ConfIOReason::from_validation("topic.num_partitions must be >= 1").err_result();
        }
        if self.replication < 1 {
            return ConfIOReason::from_validation("topic.replication must be >= 1").err_result();
        }
        Ok(())
    }
}

/// Number of replica confirmations a producer waits for.
///
/// Topics replicated more than twice tolerate one lagging follower; smaller
/// replication factors require every replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPolicy {
    required_acks: i32,
}

impl AckPolicy {
    pub fn from_replication(replication: i32) -> Self {
        let required_acks = if replication > 2 {
            replication - 1
        } else {
            replication
        };
        Self { required_acks }
    }

    pub fn required_acks(&self) -> i32 {
        self.required_acks
    }

    /// Value for the librdkafka `acks` property.
    pub fn as_config_value(&self) -> String {
        self.required_acks.to_string()
    }
}
