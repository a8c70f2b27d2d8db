//! Run locks
//!
//! Pipeline runs touching the same repository never overlap. Each repository
//! key maps to one async mutex; global runs (train, predict, signals) and the
//! shared phase of every ingest share the reserved key [`GLOBAL_KEY`]. What
//! happens to a second run while the first holds the lock is decided by the
//! [`OverlapPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Lock key shared by runs that are not scoped to one repository
pub const GLOBAL_KEY: &str = "*";

/// Behaviour when a run is requested while another holds the same key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Wait for the running one to finish
    #[default]
    Serialize,
    /// Refuse immediately
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown overlap policy '{0}', expected 'serialize' or 'reject'")]
pub struct UnknownPolicy(pub String);

impl FromStr for OverlapPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serialize" => Ok(Self::Serialize),
            "reject" => Ok(Self::Reject),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serialize => write!(f, "serialize"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Returned under [`OverlapPolicy::Reject`] when the key is held
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a run for '{0}' is already in progress")]
pub struct RunInProgress(pub String);

/// Keyed run locks
///
/// Cheap to clone; clones share the same lock table. Entries are created on
/// first use and kept for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    policy: OverlapPolicy,
    slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl RunLocks {
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            policy,
            slots: Arc::default(),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    /// Acquires the lock for `key`
    ///
    /// The lock is held until the returned guard drops.
    pub async fn acquire(&self, key: &str) -> Result<OwnedMutexGuard<()>, RunInProgress> {
        let slot = self.slot(key);

        if let Ok(guard) = slot.clone().try_lock_owned() {
            return Ok(guard);
        }

        match self.policy {
            OverlapPolicy::Reject => {
                debug!("Run for '{}' rejected, another is in progress", key);
                Err(RunInProgress(key.to_string()))
            }
            OverlapPolicy::Serialize => {
                debug!("Run for '{}' waiting for the one in progress", key);
                Ok(slot.lock_owned().await)
            }
        }
    }

    /// Waits for the lock for `key` whatever the policy
    ///
    /// For runs that are already under way and must not be refused midway.
    pub async fn wait(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = self.slot(key);
        if let Ok(guard) = slot.clone().try_lock_owned() {
            return guard;
        }
        debug!("Run waiting for '{}' to be released", key);
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("serialize".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Serialize));
        assert_eq!(" Reject ".parse::<OverlapPolicy>(), Ok(OverlapPolicy::Reject));
        assert!("queue".parse::<OverlapPolicy>().is_err());
        assert_eq!(OverlapPolicy::default().to_string(), "serialize");
    }

    #[tokio::test]
    async fn test_reject_while_held() {
        let locks = RunLocks::new(OverlapPolicy::Reject);
        let guard = locks.acquire("acme/widgets").await.unwrap();

        assert_eq!(
            locks.acquire("acme/widgets").await.unwrap_err(),
            RunInProgress("acme/widgets".to_string())
        );
        // Other keys are independent
        assert!(locks.acquire("acme/gadgets").await.is_ok());

        drop(guard);
        assert!(locks.acquire("acme/widgets").await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_ignores_reject_policy() {
        let locks = RunLocks::new(OverlapPolicy::Reject);
        let guard = locks.acquire(GLOBAL_KEY).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.wait(GLOBAL_KEY).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_serialize_waits_for_release() {
        let locks = RunLocks::new(OverlapPolicy::Serialize);
        let guard = locks.acquire(GLOBAL_KEY).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(GLOBAL_KEY).await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
