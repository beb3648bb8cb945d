//! Tournament lifecycle administration

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::LedgerOps;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{LedgerStore, Write};
use crate::types::{
    generate_doc_id, Bucket, EntryId, EntryType, LedgerEntry, Timestamp, Tournament, TournamentId,
    TournamentKind, TournamentStatus, UserId,
};

/// Parameters for creating a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub kind: TournamentKind,
    pub entry_fee: u64,
    pub prize_pool: u64,
    pub max_players: u32,
    pub start_time: Timestamp,
    /// Override of the app-wide fee spend order for this tournament
    #[serde(default)]
    pub fee_priority: Option<[Bucket; 3]>,
    #[serde(default)]
    pub room_code: Option<String>,
    #[serde(default)]
    pub room_password: Option<String>,
}

impl<S: LedgerStore> LedgerOps<S> {
    /// Create a tournament; it opens in the upcoming state with no players
    pub async fn create_tournament(
        &self,
        params: NewTournament,
        created_by: &UserId,
    ) -> LedgerResult<(TournamentId, Tournament)> {
        let tournament = Tournament {
            name: params.name,
            kind: params.kind,
            entry_fee: params.entry_fee,
            prize_pool: params.prize_pool,
            max_players: params.max_players,
            current_players: 0,
            status: TournamentStatus::Upcoming,
            fee_priority: params.fee_priority,
            created_by: created_by.clone(),
            start_time: params.start_time,
            created_at: Timestamp::now(),
            room_code: params.room_code,
            room_password: params.room_password,
        };

        let id = TournamentId::new(generate_doc_id());
        self.storage()
            .commit(vec![Write::Tournament {
                id: id.clone(),
                doc: tournament.clone(),
                expect: 0,
            }])
            .await?;
        info!(tournament_id = %id, name = %tournament.name, "tournament created");
        Ok((id, tournament))
    }

    /// Move a tournament to a new lifecycle state.
    ///
    /// Only forward transitions are allowed: upcoming to ongoing or
    /// cancelled, ongoing to finished or cancelled.
    pub async fn set_tournament_status(
        &self,
        tournament_id: &TournamentId,
        status: TournamentStatus,
    ) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let tournament = self
                .storage()
                .get_tournament(tournament_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound {
                    collection: "tournaments",
                    id: tournament_id.to_string(),
                })?;

            if !tournament.doc.status.can_transition_to(status) {
                return Err(LedgerError::InvalidState(format!(
                    "cannot move tournament from {} to {}",
                    tournament.doc.status, status
                )));
            }

            let mut new_tournament = tournament.doc.clone();
            new_tournament.status = status;

            let result = self
                .storage()
                .commit(vec![Write::Tournament {
                    id: tournament_id.clone(),
                    doc: new_tournament,
                    expect: tournament.version,
                }])
                .await;
            match result {
                Ok(()) => {
                    info!(tournament_id = %tournament_id, %status, "tournament status updated");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(tournament_id = %tournament_id, attempt, "status update conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Credit a prize to a participant's winning bucket.
    ///
    /// The user must actually be registered in the tournament. Records a
    /// completed ledger entry alongside the wallet credit.
    pub async fn award_prize(
        &self,
        tournament_id: &TournamentId,
        user_id: &UserId,
        amount: u64,
    ) -> LedgerResult<()> {
        if amount == 0 {
            return Err(LedgerError::InvalidState(
                "prize amount must be positive".to_string(),
            ));
        }
        self.storage()
            .get_participant(tournament_id, user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                collection: "participants",
                id: crate::types::participant_key(tournament_id, user_id),
            })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let user = self.storage().get_user(user_id).await?.ok_or_else(|| {
                LedgerError::NotFound {
                    collection: "users",
                    id: user_id.to_string(),
                }
            })?;

            let mut new_user = user.doc.clone();
            new_user.wallet.credit(Bucket::Winning, amount);
            let entry = LedgerEntry::completed(EntryType::TournamentWin, amount, user_id.clone());

            let result = self
                .storage()
                .commit(vec![
                    Write::User {
                        id: user_id.clone(),
                        doc: new_user,
                        expect: user.version,
                    },
                    Write::Entry {
                        id: EntryId::new(generate_doc_id()),
                        doc: entry,
                        expect: 0,
                    },
                ])
                .await;
            match result {
                Ok(()) => {
                    info!(%tournament_id, %user_id, amount, "prize awarded");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(%user_id, attempt, "prize award conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
