//! Settlement operations
//!
//! Each operation reads versioned snapshots, computes the new documents in
//! memory, and commits the whole batch with the versions it read as
//! preconditions. On [`LedgerError::Conflict`] the operation re-reads and
//! retries up to the configured attempt budget.

pub mod join;
pub mod register;
pub mod settlement;
pub mod tournament_admin;

use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{LedgerStore, Write};
use crate::types::AppSettings;

/// Operation executor over a storage backend
#[derive(Debug)]
pub struct LedgerOps<S> {
    storage: Arc<S>,
    config: LedgerConfig,
}

impl<S: LedgerStore> LedgerOps<S> {
    pub fn new(storage: Arc<S>, config: LedgerConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current app settings
    pub async fn settings(&self) -> LedgerResult<AppSettings> {
        Ok(self.storage.get_settings().await?.doc)
    }

    /// Replace the app settings document
    pub async fn update_settings(&self, settings: AppSettings) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = self.storage.get_settings().await?;
            let result = self
                .storage
                .commit(vec![Write::Settings {
                    doc: settings.clone(),
                    expect: current.version,
                }])
                .await;
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retriable() && attempt < self.config.max_txn_attempts => {
                    tracing::debug!(attempt, "settings update conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt })
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::UserId;

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let ops = LedgerOps::new(Arc::new(MemoryStore::new()), LedgerConfig::default());

        let mut settings = ops.settings().await.unwrap();
        assert!(!settings.maintenance_mode);

        settings.maintenance_mode = true;
        settings.admin_uids.push(UserId::from("a1"));
        ops.update_settings(settings).await.unwrap();

        let settings = ops.settings().await.unwrap();
        assert!(settings.maintenance_mode);
        assert!(settings.is_admin(&UserId::from("a1")));
    }
}
