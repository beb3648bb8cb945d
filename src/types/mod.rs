//! Document types shared across the ledger core
//!
//! Every persisted document is an explicit serde record validated at the
//! store boundary; malformed documents are rejected rather than propagated.

pub mod common;
pub mod participant;
pub mod settings;
pub mod tournament;
pub mod transaction;
pub mod user;
pub mod wallet;

pub use common::{
    generate_doc_id, generate_referral_code, EntryId, Session, Timestamp, TournamentId, UserId,
    REFERRAL_CODE_LEN,
};
pub use participant::{participant_key, Participant, ParticipantStatus};
pub use settings::AppSettings;
pub use tournament::{Tournament, TournamentKind, TournamentStatus};
pub use transaction::{EntryStatus, EntryType, LedgerEntry};
pub use user::User;
pub use wallet::{validate_priority, Bucket, Wallet, DEFAULT_JOIN_FEE_PRIORITY};
