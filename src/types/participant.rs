//! Participant record
//!
//! Keyed by `(tournament_id, user_id)` and created exactly once by the join
//! coordinator; its existence is the commitment that a user holds a seat.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{Timestamp, TournamentId, UserId};

/// Participant lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    #[default]
    Active,
    Eliminated,
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Eliminated => write!(f, "eliminated"),
        }
    }
}

/// Participant record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
    pub joined_at: Timestamp,
    pub status: ParticipantStatus,
}

impl Participant {
    /// New active participant
    pub fn new(tournament_id: TournamentId, user_id: UserId) -> Self {
        Self {
            tournament_id,
            user_id,
            joined_at: Timestamp::now(),
            status: ParticipantStatus::Active,
        }
    }

    /// Storage key for the `(tournament, user)` pair
    pub fn key(&self) -> String {
        participant_key(&self.tournament_id, &self.user_id)
    }
}

/// Compose the storage key for a participant record
pub fn participant_key(tournament_id: &TournamentId, user_id: &UserId) -> String {
    format!("{}/{}", tournament_id, user_id)
}
