//! Tournament document
//!
//! # Status state machine
//!
//! ```text
//! upcoming ──→ ongoing ──→ finished
//!     │           │
//!     └───────────┴──→ cancelled
//! ```
//!
//! Joins are accepted only while `upcoming` or `ongoing`. The occupancy
//! counter is mutated exclusively by the join coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{Timestamp, UserId};
use super::wallet::{validate_priority, Bucket};
use crate::error::{LedgerError, LedgerResult};

/// Tournament team size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentKind {
    Solo,
    Duo,
    Squad,
}

impl fmt::Display for TournamentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solo => write!(f, "solo"),
            Self::Duo => write!(f, "duo"),
            Self::Squad => write!(f, "squad"),
        }
    }
}

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Announced, not yet started
    #[default]
    Upcoming,
    /// Currently being played
    Ongoing,
    /// Played to completion
    Finished,
    /// Called off before completion
    Cancelled,
}

impl TournamentStatus {
    /// Whether joins are accepted in this status
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }

    /// Whether this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }

    /// Whether a transition to `target` is allowed
    pub fn can_transition_to(&self, target: TournamentStatus) -> bool {
        match (self, target) {
            (Self::Upcoming, Self::Ongoing) => true,
            (Self::Upcoming, Self::Cancelled) => true,
            (Self::Ongoing, Self::Finished) => true,
            (Self::Ongoing, Self::Cancelled) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upcoming => write!(f, "upcoming"),
            Self::Ongoing => write!(f, "ongoing"),
            Self::Finished => write!(f, "finished"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tournament document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub name: String,
    pub kind: TournamentKind,
    /// Entry fee charged on join
    pub entry_fee: u64,
    pub prize_pool: u64,
    pub max_players: u32,
    /// Occupancy counter; monotonically non-decreasing, written only by the
    /// join coordinator
    pub current_players: u32,
    pub status: TournamentStatus,
    /// Spend-order override; falls back to the app-settings default when unset
    #[serde(default)]
    pub fee_priority: Option<[Bucket; 3]>,
    pub created_by: UserId,
    pub start_time: Timestamp,
    pub created_at: Timestamp,
    /// Room details, distributed out of band once the tournament is ongoing
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub room_password: Option<String>,
}

impl Tournament {
    /// Whether occupancy has reached the limit
    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players
    }

    /// Validate the document shape at the store boundary
    pub fn validate(&self) -> LedgerResult<()> {
        if self.name.is_empty() {
            return Err(LedgerError::MalformedDocument(
                "tournament name is empty".to_string(),
            ));
        }
        if self.max_players == 0 {
            return Err(LedgerError::MalformedDocument(
                "max_players must be positive".to_string(),
            ));
        }
        if self.current_players > self.max_players {
            return Err(LedgerError::MalformedDocument(format!(
                "current_players {} exceeds max_players {}",
                self.current_players, self.max_players
            )));
        }
        if let Some(priority) = &self.fee_priority {
            validate_priority(priority)?;
        }
        Ok(())
    }
}
