//! Ledger Error Types
//!
//! Error definitions for wallet settlement and tournament-join operations.

use thiserror::Error;

use crate::types::TournamentStatus;

/// Ledger Error
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Entry fee cannot be covered by the wallet buckets
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// A participant record already exists for this user and tournament
    #[error("user has already joined this tournament")]
    AlreadyJoined,

    /// Tournament occupancy has reached its limit
    #[error("tournament is full ({max_players} players)")]
    TournamentFull { max_players: u32 },

    /// Tournament is not accepting joins in its current status
    #[error("tournament is not joinable while {0}")]
    TournamentNotJoinable(TournamentStatus),

    /// Optimistic-concurrency retries exhausted
    #[error("commit contention: gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    /// Operation attempted against a document in the wrong state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Referenced document does not exist
    #[error("{collection} document not found: {id}")]
    NotFound { collection: &'static str, id: String },

    /// Version precondition failed during commit
    #[error("write conflict on {collection}")]
    Conflict { collection: &'static str },

    /// Caller lacks the admin capability
    #[error("admin privileges required")]
    NotAuthorized,

    /// Platform is in maintenance mode
    #[error("platform is in maintenance mode")]
    Maintenance,

    /// Operation disabled via app settings
    #[error("operation is currently disabled: {0}")]
    OperationDisabled(&'static str),

    /// Document failed validation at the store boundary
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Storage backend error
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Whether the coordinator may retry the whole attempt with fresh reads.
    ///
    /// Only version-precondition conflicts are retriable; every other error
    /// is terminal for the attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(self, LedgerError::Conflict { .. })
    }
}

/// Ledger Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(e: sled::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}
