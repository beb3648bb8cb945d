//! Tournament join coordinator
//!
//! The join is a single atomic transaction: debit the entry fee across the
//! wallet buckets, create the participant record, bump the player count, and
//! record a completed ledger entry. Either all four writes land or none do.
//! All gate checks run against the same snapshot the commit is predicated on,
//! so a concurrent join that would oversell the roster or double-spend the
//! wallet fails the version precondition and is retried against fresh state.

use tracing::{debug, info};

use super::LedgerOps;
use crate::allocator;
use crate::error::{LedgerError, LedgerResult};
use crate::gate;
use crate::storage::{LedgerStore, Write};
use crate::types::{
    generate_doc_id, EntryId, EntryType, LedgerEntry, Participant, TournamentId, UserId,
};

impl<S: LedgerStore> LedgerOps<S> {
    /// Join a tournament, settling the entry fee from the user's wallet.
    ///
    /// Retries on commit conflicts up to the configured attempt budget, then
    /// fails with [`LedgerError::Contention`]. Every other error is final.
    pub async fn join_tournament(
        &self,
        user_id: &UserId,
        tournament_id: &TournamentId,
    ) -> LedgerResult<Participant> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_join(user_id, tournament_id).await {
                Ok(participant) => {
                    info!(%user_id, %tournament_id, attempt, "tournament join committed");
                    return Ok(participant);
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(%user_id, %tournament_id, attempt, "join conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_join(
        &self,
        user_id: &UserId,
        tournament_id: &TournamentId,
    ) -> LedgerResult<Participant> {
        let storage = self.storage();

        let settings = storage.get_settings().await?;
        let tournament = storage.get_tournament(tournament_id).await?.ok_or_else(|| {
            LedgerError::NotFound {
                collection: "tournaments",
                id: tournament_id.to_string(),
            }
        })?;
        let user = storage.get_user(user_id).await?.ok_or_else(|| {
            LedgerError::NotFound {
                collection: "users",
                id: user_id.to_string(),
            }
        })?;
        let already_joined = storage
            .get_participant(tournament_id, user_id)
            .await?
            .is_some();

        gate::check_join(&tournament.doc, already_joined)?;

        // Tournament override wins over the app-wide default order.
        let priority = tournament
            .doc
            .fee_priority
            .unwrap_or(settings.doc.default_join_fee_priority);
        let plan = allocator::allocate(tournament.doc.entry_fee, &priority, &user.doc.wallet)?;

        let mut new_user = user.doc.clone();
        plan.apply(&mut new_user.wallet)?;

        let mut new_tournament = tournament.doc.clone();
        new_tournament.current_players += 1;

        let participant = Participant::new(tournament_id.clone(), user_id.clone());
        let entry = LedgerEntry::completed(
            EntryType::TournamentJoin,
            tournament.doc.entry_fee,
            user_id.clone(),
        );

        storage
            .commit(vec![
                Write::User {
                    id: user_id.clone(),
                    doc: new_user,
                    expect: user.version,
                },
                Write::Tournament {
                    id: tournament_id.clone(),
                    doc: new_tournament,
                    expect: tournament.version,
                },
                Write::Participant {
                    doc: participant.clone(),
                },
                Write::Entry {
                    id: EntryId::new(generate_doc_id()),
                    doc: entry,
                    expect: 0,
                },
            ])
            .await?;

        Ok(participant)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::config::LedgerConfig;
    use crate::storage::{LedgerStore, MemoryStore, Versioned};
    use crate::types::{
        AppSettings, Bucket, EntryStatus, Timestamp, Tournament, TournamentKind, TournamentStatus,
        User, Wallet,
    };

    fn tournament(entry_fee: u64, max_players: u32) -> Tournament {
        Tournament {
            name: "Evening Cup".to_string(),
            kind: TournamentKind::Solo,
            entry_fee,
            prize_pool: entry_fee * u64::from(max_players),
            max_players,
            current_players: 0,
            status: TournamentStatus::Upcoming,
            fee_priority: None,
            created_by: UserId::from("admin-1"),
            start_time: Timestamp::now(),
            created_at: Timestamp::now(),
            room_code: None,
            room_password: None,
        }
    }

    fn user_with_wallet(wallet: Wallet) -> User {
        let mut user = User::new("player", "player@example.com");
        user.wallet = wallet;
        user
    }

    async fn seed(store: &MemoryStore, uid: &str, wallet: Wallet, tid: &str, t: Tournament) {
        store
            .commit(vec![
                Write::User {
                    id: UserId::from(uid),
                    doc: user_with_wallet(wallet),
                    expect: 0,
                },
                Write::Tournament {
                    id: TournamentId::from(tid),
                    doc: t,
                    expect: 0,
                },
            ])
            .await
            .unwrap();
    }

    fn ops(store: Arc<MemoryStore>) -> LedgerOps<MemoryStore> {
        LedgerOps::new(store, LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_join_settles_fee_and_registers() {
        let store = Arc::new(MemoryStore::new());
        let wallet = Wallet {
            deposit: 50,
            winning: 30,
            bonus: 0,
        };
        seed(&store, "u1", wallet, "t1", tournament(60, 10)).await;

        let ops = ops(store.clone());
        let participant = ops
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap();
        assert_eq!(participant.user_id, UserId::from("u1"));

        // Winning drained first, spill into deposit.
        let user = store.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(user.doc.wallet.winning, 0);
        assert_eq!(user.doc.wallet.deposit, 20);

        let t = store
            .get_tournament(&TournamentId::from("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.doc.current_players, 1);

        let entries = store
            .list_entries(EntryType::TournamentJoin, EntryStatus::Completed)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.amount, 60);
    }

    #[tokio::test]
    async fn test_tournament_priority_override() {
        let store = Arc::new(MemoryStore::new());
        let mut t = tournament(30, 10);
        t.fee_priority = Some([Bucket::Bonus, Bucket::Deposit, Bucket::Winning]);
        let wallet = Wallet {
            deposit: 100,
            winning: 100,
            bonus: 30,
        };
        seed(&store, "u1", wallet, "t1", t).await;

        ops(store.clone())
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap();

        let user = store.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(user.doc.wallet.bonus, 0);
        assert_eq!(user.doc.wallet.deposit, 100);
        assert_eq!(user.doc.wallet.winning, 100);
    }

    #[tokio::test]
    async fn test_insufficient_funds_changes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let wallet = Wallet {
            deposit: 5,
            winning: 0,
            bonus: 0,
        };
        seed(&store, "u1", wallet, "t1", tournament(60, 10)).await;

        let err = ops(store.clone())
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required: 60,
                available: 5
            }
        ));

        let user = store.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(user.doc.wallet.deposit, 5);
        let t = store
            .get_tournament(&TournamentId::from("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.doc.current_players, 0);
        assert!(store
            .get_participant(&TournamentId::from("t1"), &UserId::from("u1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_double_join_rejected() {
        let store = Arc::new(MemoryStore::new());
        let wallet = Wallet {
            deposit: 200,
            winning: 0,
            bonus: 0,
        };
        seed(&store, "u1", wallet, "t1", tournament(10, 10)).await;

        let ops = ops(store.clone());
        ops.join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap();
        let err = ops
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyJoined));

        // Charged exactly once.
        let user = store.get_user(&UserId::from("u1")).await.unwrap().unwrap();
        assert_eq!(user.doc.wallet.deposit, 190);
    }

    #[tokio::test]
    async fn test_full_tournament_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut t = tournament(10, 2);
        t.current_players = 2;
        let wallet = Wallet {
            deposit: 100,
            winning: 0,
            bonus: 0,
        };
        seed(&store, "u1", wallet, "t1", t).await;

        let err = ops(store.clone())
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TournamentFull { max_players: 2 }));
    }

    #[tokio::test]
    async fn test_finished_tournament_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut t = tournament(10, 10);
        t.status = TournamentStatus::Finished;
        let wallet = Wallet {
            deposit: 100,
            winning: 0,
            bonus: 0,
        };
        seed(&store, "u1", wallet, "t1", t).await;

        let err = ops(store.clone())
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::TournamentNotJoinable(TournamentStatus::Finished)
        ));
    }

    #[tokio::test]
    async fn test_missing_tournament_not_found() {
        let store = Arc::new(MemoryStore::new());
        store
            .commit(vec![Write::User {
                id: UserId::from("u1"),
                doc: user_with_wallet(Wallet::zero()),
                expect: 0,
            }])
            .await
            .unwrap();

        let err = ops(store)
            .join_tournament(&UserId::from("u1"), &TournamentId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::NotFound {
                collection: "tournaments",
                ..
            }
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_joins_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let max_players = 3;
        store
            .commit(vec![Write::Tournament {
                id: TournamentId::from("t1"),
                doc: tournament(10, max_players),
                expect: 0,
            }])
            .await
            .unwrap();

        let joiners = 8u32;
        for i in 0..joiners {
            store
                .commit(vec![Write::User {
                    id: UserId::from(format!("u{i}").as_str()),
                    doc: user_with_wallet(Wallet {
                        deposit: 100,
                        winning: 0,
                        bonus: 0,
                    }),
                    expect: 0,
                }])
                .await
                .unwrap();
        }

        let ops = Arc::new(LedgerOps::new(
            store.clone(),
            LedgerConfig {
                max_txn_attempts: 20,
                ..LedgerConfig::default()
            },
        ));

        let mut handles = Vec::new();
        for i in 0..joiners {
            let ops = ops.clone();
            handles.push(tokio::spawn(async move {
                ops.join_tournament(&UserId::from(format!("u{i}").as_str()), &TournamentId::from("t1"))
                    .await
            }));
        }

        let mut admitted = 0;
        let mut rejected_full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(LedgerError::TournamentFull { .. }) => rejected_full += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(admitted, max_players);
        assert_eq!(rejected_full, joiners - max_players);

        let t = store
            .get_tournament(&TournamentId::from("t1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(t.doc.current_players, max_players);
    }

    /// Store whose commits always conflict, to exercise the attempt budget.
    struct AlwaysConflict(MemoryStore);

    #[async_trait]
    impl LedgerStore for AlwaysConflict {
        async fn get_user(&self, id: &UserId) -> LedgerResult<Option<Versioned<User>>> {
            self.0.get_user(id).await
        }
        async fn get_tournament(
            &self,
            id: &TournamentId,
        ) -> LedgerResult<Option<Versioned<Tournament>>> {
            self.0.get_tournament(id).await
        }
        async fn get_participant(
            &self,
            tournament_id: &TournamentId,
            user_id: &UserId,
        ) -> LedgerResult<Option<Participant>> {
            self.0.get_participant(tournament_id, user_id).await
        }
        async fn get_entry(
            &self,
            id: &EntryId,
        ) -> LedgerResult<Option<Versioned<LedgerEntry>>> {
            self.0.get_entry(id).await
        }
        async fn get_settings(&self) -> LedgerResult<Versioned<AppSettings>> {
            self.0.get_settings().await
        }
        async fn find_user_by_referral_code(
            &self,
            code: &str,
        ) -> LedgerResult<Option<(UserId, Versioned<User>)>> {
            self.0.find_user_by_referral_code(code).await
        }
        async fn list_entries(
            &self,
            entry_type: EntryType,
            status: EntryStatus,
        ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>> {
            self.0.list_entries(entry_type, status).await
        }
        async fn commit(&self, _writes: Vec<Write>) -> LedgerResult<()> {
            Err(LedgerError::Conflict {
                collection: "users",
            })
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_contention() {
        let inner = MemoryStore::new();
        inner
            .commit(vec![
                Write::User {
                    id: UserId::from("u1"),
                    doc: user_with_wallet(Wallet {
                        deposit: 100,
                        winning: 0,
                        bonus: 0,
                    }),
                    expect: 0,
                },
                Write::Tournament {
                    id: TournamentId::from("t1"),
                    doc: tournament(10, 10),
                    expect: 0,
                },
            ])
            .await
            .unwrap();

        let ops = LedgerOps::new(
            Arc::new(AlwaysConflict(inner)),
            LedgerConfig {
                max_txn_attempts: 4,
                ..LedgerConfig::default()
            },
        );
        let err = ops
            .join_tournament(&UserId::from("u1"), &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Contention { attempts: 4 }));
    }
}
