use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Topic names confirmed provisioned during this process.
///
/// Entries are only added after a confirmed creation or a successful existence
/// probe and are never removed. The lock is held by the provisioner across the
/// whole probe-then-create sequence.
#[derive(Debug, Default)]
pub struct ProvisioningRegistry {
    topics: Mutex<HashSet<String>>,
}

impl ProvisioningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.topics.lock().await.contains(name)
    }

    /// Records a topic provisioned by some other means, e.g. created out of band
    /// before this process started.
    pub async fn mark_provisioned(&self, name: &str) -> bool {
        self.topics.lock().await.insert(name.to_string())
    }

    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.lock().await.iter().cloned().collect();
        names.sort();
        names
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.topics.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn marks_are_idempotent_and_sorted() {
        let registry = ProvisioningRegistry::new();
        assert!(!registry.contains("stations").await);
        assert!(registry.mark_provisioned("stations").await);
        assert!(!registry.mark_provisioned("stations").await);
        registry.mark_provisioned("arrivals").await;
        assert_eq!(registry.names().await, vec!["arrivals", "stations"]);
    }
}
