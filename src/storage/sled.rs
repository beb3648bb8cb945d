//! Sled persistent storage implementation
//!
//! One tree per collection, JSON document encoding. Commits are serialized by
//! an async mutex and re-validate every version precondition inside the
//! critical section before applying the batch, which preserves the optimistic
//! contract: a writer holding stale versions observes `Conflict`. The batch
//! itself is encoded up front and applied as one sled multi-tree transaction,
//! so a backend failure mid-batch cannot leave part of it behind.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::TransactionError;
use sled::Transactional;
use tokio::sync::Mutex;

use super::{LedgerStore, StorageConfig, Versioned, Write, SETTINGS_KEY};
use crate::error::{LedgerError, LedgerResult};
use crate::types::{
    participant_key, AppSettings, EntryId, EntryStatus, EntryType, LedgerEntry, Participant,
    Tournament, TournamentId, User, UserId,
};

const USERS_TREE: &str = "users";
const TOURNAMENTS_TREE: &str = "tournaments";
const PARTICIPANTS_TREE: &str = "participants";
const ENTRIES_TREE: &str = "transactions";
const SETTINGS_TREE: &str = "settings";

enum Table {
    Users,
    Tournaments,
    Participants,
    Entries,
    Settings,
}

/// A write resolved to its destination tree, key, and encoded bytes
struct Staged {
    table: Table,
    key: String,
    bytes: Vec<u8>,
}

/// Sled-backed persistent store
#[derive(Debug)]
pub struct SledStore {
    db: sled::Db,
    users: sled::Tree,
    tournaments: sled::Tree,
    participants: sled::Tree,
    entries: sled::Tree,
    settings: sled::Tree,
    flush_on_commit: bool,
    // Serializes commit critical sections; reads stay lock-free.
    commit_lock: Mutex<()>,
}

impl SledStore {
    /// Open or create the database described by `config`
    pub fn new(config: &StorageConfig) -> LedgerResult<Self> {
        let db = sled::Config::new()
            .path(&config.data_dir)
            .cache_capacity(config.cache_bytes)
            .open()
            .map_err(|e| LedgerError::Storage(format!("failed to open sled db: {e}")))?;

        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|e| LedgerError::Storage(format!("failed to open {name} tree: {e}")))
        };

        Ok(Self {
            users: open(USERS_TREE)?,
            tournaments: open(TOURNAMENTS_TREE)?,
            participants: open(PARTICIPANTS_TREE)?,
            entries: open(ENTRIES_TREE)?,
            settings: open(SETTINGS_TREE)?,
            flush_on_commit: config.flush_on_commit,
            commit_lock: Mutex::new(()),
            db,
        })
    }

    /// Flush all trees to disk
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }

    fn serialize<T: Serialize>(value: &T) -> LedgerResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> LedgerResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn read<T: DeserializeOwned>(tree: &sled::Tree, key: &str) -> LedgerResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn current_version(tree: &sled::Tree, key: &str) -> LedgerResult<u64> {
        // Versions live inside the JSON envelope; absent documents are 0.
        #[derive(serde::Deserialize)]
        struct VersionOnly {
            version: u64,
        }
        Ok(Self::read::<VersionOnly>(tree, key)?
            .map(|v| v.version)
            .unwrap_or(0))
    }

    fn check(&self, write: &Write) -> LedgerResult<()> {
        write.validate()?;
        match write {
            Write::User { id, expect, .. } => {
                if Self::current_version(&self.users, id.as_str())? != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "users",
                    });
                }
            }
            Write::Tournament { id, expect, .. } => {
                if Self::current_version(&self.tournaments, id.as_str())? != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "tournaments",
                    });
                }
            }
            Write::Participant { doc } => {
                if self.participants.contains_key(doc.key())? {
                    return Err(LedgerError::AlreadyJoined);
                }
            }
            Write::Entry { id, expect, .. } => {
                if Self::current_version(&self.entries, id.as_str())? != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "transactions",
                    });
                }
            }
            Write::Settings { expect, .. } => {
                if Self::current_version(&self.settings, SETTINGS_KEY)? != *expect {
                    return Err(LedgerError::Conflict {
                        collection: "settings",
                    });
                }
            }
        }
        Ok(())
    }

    // Encoding happens here, before anything touches a tree, so the apply
    // phase can only fail inside sled's own transaction.
    fn stage(write: &Write) -> LedgerResult<Staged> {
        let (table, key, bytes) = match write {
            Write::User { id, doc, expect } => (
                Table::Users,
                id.as_str().to_string(),
                Self::serialize(&Versioned::new(expect + 1, doc))?,
            ),
            Write::Tournament { id, doc, expect } => (
                Table::Tournaments,
                id.as_str().to_string(),
                Self::serialize(&Versioned::new(expect + 1, doc))?,
            ),
            Write::Participant { doc } => (Table::Participants, doc.key(), Self::serialize(doc)?),
            Write::Entry { id, doc, expect } => (
                Table::Entries,
                id.as_str().to_string(),
                Self::serialize(&Versioned::new(expect + 1, doc))?,
            ),
            Write::Settings { doc, expect } => (
                Table::Settings,
                SETTINGS_KEY.to_string(),
                Self::serialize(&Versioned::new(expect + 1, doc))?,
            ),
        };
        Ok(Staged { table, key, bytes })
    }
}

#[async_trait]
impl LedgerStore for SledStore {
    async fn get_user(&self, id: &UserId) -> LedgerResult<Option<Versioned<User>>> {
        let read: Option<Versioned<User>> = Self::read(&self.users, id.as_str())?;
        if let Some(v) = &read {
            v.doc.validate()?;
        }
        Ok(read)
    }

    async fn get_tournament(
        &self,
        id: &TournamentId,
    ) -> LedgerResult<Option<Versioned<Tournament>>> {
        let read: Option<Versioned<Tournament>> = Self::read(&self.tournaments, id.as_str())?;
        if let Some(v) = &read {
            v.doc.validate()?;
        }
        Ok(read)
    }

    async fn get_participant(
        &self,
        tournament_id: &TournamentId,
        user_id: &UserId,
    ) -> LedgerResult<Option<Participant>> {
        let key = participant_key(tournament_id, user_id);
        Self::read(&self.participants, &key)
    }

    async fn get_entry(&self, id: &EntryId) -> LedgerResult<Option<Versioned<LedgerEntry>>> {
        let read: Option<Versioned<LedgerEntry>> = Self::read(&self.entries, id.as_str())?;
        if let Some(v) = &read {
            v.doc.validate()?;
        }
        Ok(read)
    }

    async fn get_settings(&self) -> LedgerResult<Versioned<AppSettings>> {
        match Self::read::<Versioned<AppSettings>>(&self.settings, SETTINGS_KEY)? {
            Some(v) => {
                v.doc.validate()?;
                Ok(v)
            }
            None => Ok(Versioned::new(0, AppSettings::default())),
        }
    }

    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> LedgerResult<Option<(UserId, Versioned<User>)>> {
        for item in self.users.iter() {
            let (key, bytes) = item?;
            let versioned: Versioned<User> = Self::deserialize(&bytes)?;
            if versioned.doc.referral_code == code {
                let id = String::from_utf8_lossy(&key).to_string();
                return Ok(Some((UserId::new(id), versioned)));
            }
        }
        Ok(None)
    }

    async fn list_entries(
        &self,
        entry_type: EntryType,
        status: EntryStatus,
    ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>> {
        let mut entries = Vec::new();
        for item in self.entries.iter() {
            let (key, bytes) = item?;
            let versioned: Versioned<LedgerEntry> = Self::deserialize(&bytes)?;
            if versioned.doc.entry_type == entry_type && versioned.doc.status == status {
                let id = String::from_utf8_lossy(&key).to_string();
                entries.push((EntryId::new(id), versioned.doc));
            }
        }
        entries.sort_by_key(|(_, e)| e.created_at);
        Ok(entries)
    }

    async fn commit(&self, writes: Vec<Write>) -> LedgerResult<()> {
        let _guard = self.commit_lock.lock().await;

        super::check_batch_keys(&writes)?;
        for write in &writes {
            self.check(write)?;
        }
        let staged = writes
            .iter()
            .map(Self::stage)
            .collect::<LedgerResult<Vec<_>>>()?;

        // Multi-tree transaction: all inserts land or none do.
        (
            &self.users,
            &self.tournaments,
            &self.participants,
            &self.entries,
            &self.settings,
        )
            .transaction(|(users, tournaments, participants, entries, settings)| {
                for staged in &staged {
                    let tree = match staged.table {
                        Table::Users => users,
                        Table::Tournaments => tournaments,
                        Table::Participants => participants,
                        Table::Entries => entries,
                        Table::Settings => settings,
                    };
                    tree.insert(staged.key.as_bytes(), staged.bytes.clone())?;
                }
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(()) => {
                    LedgerError::Storage("commit transaction aborted".to_string())
                }
                TransactionError::Storage(e) => e.into(),
            })?;

        if self.flush_on_commit {
            self.db.flush()?;
        }
        Ok(())
    }
}
