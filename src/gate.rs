//! Tournament capacity gate
//!
//! Pre-checks enforcing the single-participation and max-occupancy invariants
//! before any allocation is attempted. Pure reads only; the same checks are
//! re-evaluated against the commit snapshot inside the join coordinator, so
//! passing the gate never authorizes a commit on its own.

use crate::error::{LedgerError, LedgerResult};
use crate::types::Tournament;

/// Check that a join attempt may proceed against this tournament snapshot.
///
/// Failure order follows the join contract: an existing participant record
/// wins over a full roster, which wins over a non-joinable status.
pub fn check_join(tournament: &Tournament, already_joined: bool) -> LedgerResult<()> {
    if already_joined {
        return Err(LedgerError::AlreadyJoined);
    }
    if tournament.is_full() {
        return Err(LedgerError::TournamentFull {
            max_players: tournament.max_players,
        });
    }
    if !tournament.status.is_joinable() {
        return Err(LedgerError::TournamentNotJoinable(tournament.status));
    }
    Ok(())
}
