//! Ledger entry document
//!
//! Append-only transaction log. The only permitted mutation is the single
//! `pending → completed` or `pending → rejected` transition performed by an
//! approval or rejection action; re-processing an already-processed entry is
//! rejected so credits can never be applied twice.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{Timestamp, UserId};
use crate::error::{LedgerError, LedgerResult};

/// Ledger entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    TournamentJoin,
    Deposit,
    Withdrawal,
    TournamentWin,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TournamentJoin => write!(f, "tournament_join"),
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::TournamentWin => write!(f, "tournament_win"),
        }
    }
}

/// Ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Awaiting an admin approval or rejection
    #[default]
    Pending,
    Completed,
    Rejected,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Ledger entry document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_type: EntryType,
    pub amount: u64,
    pub status: EntryStatus,
    pub user_id: UserId,
    pub created_at: Timestamp,
    /// Set by the approval/rejection action
    #[serde(default)]
    pub processed_at: Option<Timestamp>,
}

impl LedgerEntry {
    /// New entry awaiting admin processing
    pub fn pending(entry_type: EntryType, amount: u64, user_id: UserId) -> Self {
        Self {
            entry_type,
            amount,
            status: EntryStatus::Pending,
            user_id,
            created_at: Timestamp::now(),
            processed_at: None,
        }
    }

    /// New entry that settles immediately (joins, prize awards)
    pub fn completed(entry_type: EntryType, amount: u64, user_id: UserId) -> Self {
        Self {
            status: EntryStatus::Completed,
            ..Self::pending(entry_type, amount, user_id)
        }
    }

    fn process(&mut self, target: EntryStatus) -> LedgerResult<()> {
        if self.status != EntryStatus::Pending {
            return Err(LedgerError::InvalidState(format!(
                "{} entry is already {}",
                self.entry_type, self.status
            )));
        }
        self.status = target;
        self.processed_at = Some(Timestamp::now());
        Ok(())
    }

    /// `pending → completed`; fails once processed
    pub fn mark_completed(&mut self) -> LedgerResult<()> {
        self.process(EntryStatus::Completed)
    }

    /// `pending → rejected`; fails once processed
    pub fn mark_rejected(&mut self) -> LedgerResult<()> {
        self.process(EntryStatus::Rejected)
    }

    /// Validate the document shape at the store boundary
    pub fn validate(&self) -> LedgerResult<()> {
        if self.user_id.as_str().is_empty() {
            return Err(LedgerError::MalformedDocument(
                "ledger entry has no user id".to_string(),
            ));
        }
        if self.status == EntryStatus::Pending && self.processed_at.is_some() {
            return Err(LedgerError::MalformedDocument(
                "pending entry carries processed_at".to_string(),
            ));
        }
        Ok(())
    }
}
