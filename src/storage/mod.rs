//! Document storage layer
//!
//! Models the hosted document store the platform runs against: point reads
//! keyed by collection + id, and an atomic multi-document commit with
//! optimistic conflict detection.
//!
//! Every read of a mutable document returns a [`Versioned`] snapshot. A
//! [`Write`] carries the version the writer read (`0` for create-only); the
//! store applies a whole batch or none of it, and a failed precondition
//! surfaces as [`LedgerError::Conflict`] so the caller can retry against
//! fresh state. Successful commits to a given document are linearizable.

pub mod memory;
pub mod sled;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::{LedgerError, LedgerResult};
use crate::types::{
    AppSettings, EntryId, EntryStatus, EntryType, LedgerEntry, Participant, Tournament,
    TournamentId, User, UserId,
};

/// Document snapshot plus the version it was read at
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Versioned<T> {
    /// Monotonically increasing per-document version; `1` on creation
    pub version: u64,
    pub doc: T,
}

impl<T> Versioned<T> {
    pub fn new(version: u64, doc: T) -> Self {
        Self { version, doc }
    }
}

/// One write in an atomic commit batch.
///
/// `expect` is the document version the writer based its mutation on; `0`
/// asserts the document does not exist yet. Participant records carry no
/// version: they are create-once, and a duplicate insert fails the whole
/// batch with [`LedgerError::AlreadyJoined`].
#[derive(Debug, Clone)]
pub enum Write {
    User {
        id: UserId,
        doc: User,
        expect: u64,
    },
    Tournament {
        id: TournamentId,
        doc: Tournament,
        expect: u64,
    },
    Participant {
        doc: Participant,
    },
    Entry {
        id: EntryId,
        doc: LedgerEntry,
        expect: u64,
    },
    Settings {
        doc: AppSettings,
        expect: u64,
    },
}

/// Storage key of the singleton settings document
pub(crate) const SETTINGS_KEY: &str = "app-settings";

impl Write {
    /// Validate the enclosed document before it reaches a backend
    pub(crate) fn validate(&self) -> LedgerResult<()> {
        match self {
            Write::User { doc, .. } => doc.validate(),
            Write::Tournament { doc, .. } => doc.validate(),
            Write::Participant { .. } => Ok(()),
            Write::Entry { doc, .. } => doc.validate(),
            Write::Settings { doc, .. } => doc.validate(),
        }
    }

    /// Collection and key this write targets
    pub(crate) fn target(&self) -> (&'static str, String) {
        match self {
            Write::User { id, .. } => ("users", id.as_str().to_string()),
            Write::Tournament { id, .. } => ("tournaments", id.as_str().to_string()),
            Write::Participant { doc } => ("participants", doc.key()),
            Write::Entry { id, .. } => ("transactions", id.as_str().to_string()),
            Write::Settings { .. } => ("settings", SETTINGS_KEY.to_string()),
        }
    }
}

/// Reject batches that write the same document twice. Preconditions are
/// checked against pre-batch state, so a second write to the same key would
/// land at the same version as the first instead of above it.
pub(crate) fn check_batch_keys(writes: &[Write]) -> LedgerResult<()> {
    let mut seen = HashSet::new();
    for write in writes {
        let (collection, key) = write.target();
        if !seen.insert((collection, key.clone())) {
            return Err(LedgerError::InvalidState(format!(
                "commit batch writes {collection}/{key} more than once"
            )));
        }
    }
    Ok(())
}

/// Ledger storage interface
///
/// Reads are point lookups; `commit` is the only mutation path. Range reads
/// (`list_entries`, referral lookup) serve the admin/reporting surface.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> LedgerResult<Option<Versioned<User>>>;

    async fn get_tournament(&self, id: &TournamentId) -> LedgerResult<Option<Versioned<Tournament>>>;

    async fn get_participant(
        &self,
        tournament_id: &TournamentId,
        user_id: &UserId,
    ) -> LedgerResult<Option<Participant>>;

    async fn get_entry(&self, id: &EntryId) -> LedgerResult<Option<Versioned<LedgerEntry>>>;

    /// App settings; defaults at version `0` when the document is absent
    async fn get_settings(&self) -> LedgerResult<Versioned<AppSettings>>;

    /// Look up a user by their unique referral code
    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> LedgerResult<Option<(UserId, Versioned<User>)>>;

    /// Ledger entries of a given type and status, in creation order
    async fn list_entries(
        &self,
        entry_type: EntryType,
        status: EntryStatus,
    ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>>;

    /// Atomically apply a write batch; all-or-nothing. A batch may target
    /// each document at most once.
    async fn commit(&self, writes: Vec<Write>) -> LedgerResult<()>;
}

/// Storage configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageConfig {
    /// Data directory for the persistent backend
    pub data_dir: String,
    /// Flush to disk after every commit
    #[serde(default = "default_flush")]
    pub flush_on_commit: bool,
    /// Page-cache capacity in bytes
    #[serde(default = "default_cache")]
    pub cache_bytes: u64,
}

fn default_flush() -> bool {
    true
}

fn default_cache() -> u64 {
    64 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./arena_data".to_string(),
            flush_on_commit: true,
            cache_bytes: 64 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    /// Development preset: throwaway directory, no per-commit flush
    pub fn development() -> Self {
        Self {
            data_dir: "./arena_dev_data".to_string(),
            flush_on_commit: false,
            cache_bytes: 16 * 1024 * 1024,
        }
    }
}

pub use self::memory::MemoryStore;
pub use self::sled::SledStore;
