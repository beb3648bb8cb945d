//! Arena Ledger - Tournament Entry Settlement Core
//!
//! This crate implements the money-handling core of a tournament entry
//! platform: a multi-bucket wallet ledger, an entry-fee allocator, and an
//! atomic join coordinator with optimistic-concurrency retry.
//!
//! # Architecture
//!
//! - **Wallet Ledger**: Per-user balances split across deposit, winning and
//!   bonus buckets
//! - **Fee Allocator**: Splits an entry fee across buckets in a configured
//!   spend order
//! - **Capacity Gate**: Enforces single participation and the roster cap
//! - **Join Coordinator**: Settles the fee, registers the participant, bumps
//!   the player count and records the ledger entry in one atomic commit
//! - **Settlement**: Pending deposit/withdrawal requests with operator
//!   approval and idempotent reversal
//! - **Storage**: A versioned document store with an in-memory backend for
//!   tests and a sled backend for persistence
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arena_ledger::{ArenaClient, LedgerConfig, MemoryStore, Session, UserId};
//!
//! async fn example() {
//!     let client = ArenaClient::new(Arc::new(MemoryStore::new()), LedgerConfig::default());
//!
//!     let session = Session::user(UserId::from("player-1"));
//!     client
//!         .register(&session, "player one", "p1@example.com", None)
//!         .await
//!         .unwrap();
//!     client.request_deposit(&session, 500).await.unwrap();
//! }
//! ```

pub mod allocator;
pub mod config;
pub mod error;
pub mod gate;
pub mod ops;
pub mod storage;
pub mod types;

pub use allocator::{allocate, FeePlan};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ops::tournament_admin::NewTournament;
pub use ops::LedgerOps;
pub use storage::{LedgerStore, MemoryStore, SledStore, StorageConfig, Versioned, Write};
pub use types::{
    AppSettings, Bucket, EntryId, EntryStatus, EntryType, LedgerEntry, Participant, Session,
    Timestamp, Tournament, TournamentId, TournamentKind, TournamentStatus, User, UserId, Wallet,
    DEFAULT_JOIN_FEE_PRIORITY,
};

use std::sync::Arc;

/// Arena settlement client
///
/// Session-aware facade over [`LedgerOps`]. Participant operations honor the
/// maintenance switch and the per-operation enable flags; admin operations
/// require an admin session.
pub struct ArenaClient<S> {
    ops: LedgerOps<S>,
}

impl<S: LedgerStore> ArenaClient<S> {
    /// Create a new client over a storage backend
    pub fn new(storage: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            ops: LedgerOps::new(storage, config),
        }
    }

    /// Direct access to the operation layer, bypassing session gating
    pub fn ops(&self) -> &LedgerOps<S> {
        &self.ops
    }

    /// Current app settings
    pub async fn settings(&self) -> LedgerResult<AppSettings> {
        self.ops.settings().await
    }

    async fn open_settings(&self) -> LedgerResult<AppSettings> {
        let settings = self.ops.settings().await?;
        if settings.maintenance_mode {
            return Err(LedgerError::Maintenance);
        }
        Ok(settings)
    }

    async fn ensure_admin(&self, session: &Session) -> LedgerResult<()> {
        if session.admin {
            return Ok(());
        }
        let settings = self.ops.settings().await?;
        if settings.is_admin(&session.user_id) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized)
    }

    // Participant surface

    /// Register the session's user
    pub async fn register(
        &self,
        session: &Session,
        username: &str,
        email: &str,
        referral_code: Option<&str>,
    ) -> LedgerResult<User> {
        self.open_settings().await?;
        self.ops
            .register_user(&session.user_id, username, email, referral_code)
            .await
    }

    /// Link a referrer to the session's user
    pub async fn link_referral(&self, session: &Session, code: &str) -> LedgerResult<()> {
        self.open_settings().await?;
        self.ops.link_referral(&session.user_id, code).await
    }

    /// Join a tournament, settling the entry fee
    pub async fn join_tournament(
        &self,
        session: &Session,
        tournament_id: &TournamentId,
    ) -> LedgerResult<Participant> {
        self.open_settings().await?;
        self.ops
            .join_tournament(&session.user_id, tournament_id)
            .await
    }

    /// Raise a deposit request
    pub async fn request_deposit(&self, session: &Session, amount: u64) -> LedgerResult<EntryId> {
        let settings = self.open_settings().await?;
        if !settings.deposit_enabled {
            return Err(LedgerError::OperationDisabled("deposit"));
        }
        self.ops.request_deposit(&session.user_id, amount).await
    }

    /// Raise a withdrawal request; the funds are held immediately
    pub async fn request_withdrawal(
        &self,
        session: &Session,
        amount: u64,
    ) -> LedgerResult<EntryId> {
        let settings = self.open_settings().await?;
        if !settings.withdrawal_enabled {
            return Err(LedgerError::OperationDisabled("withdrawal"));
        }
        self.ops.request_withdrawal(&session.user_id, amount).await
    }

    /// The session user's wallet
    pub async fn wallet(&self, session: &Session) -> LedgerResult<Wallet> {
        let user = self
            .ops
            .storage()
            .get_user(&session.user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                collection: "users",
                id: session.user_id.to_string(),
            })?;
        Ok(user.doc.wallet)
    }

    // Admin surface

    /// Create a tournament
    pub async fn create_tournament(
        &self,
        session: &Session,
        params: NewTournament,
    ) -> LedgerResult<(TournamentId, Tournament)> {
        self.ensure_admin(session).await?;
        self.ops.create_tournament(params, &session.user_id).await
    }

    /// Move a tournament to a new lifecycle state
    pub async fn set_tournament_status(
        &self,
        session: &Session,
        tournament_id: &TournamentId,
        status: TournamentStatus,
    ) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.set_tournament_status(tournament_id, status).await
    }

    /// Credit a prize to a participant
    pub async fn award_prize(
        &self,
        session: &Session,
        tournament_id: &TournamentId,
        user_id: &UserId,
        amount: u64,
    ) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.award_prize(tournament_id, user_id, amount).await
    }

    /// Approve a pending deposit
    pub async fn approve_deposit(&self, session: &Session, entry_id: &EntryId) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.approve_deposit(entry_id).await
    }

    /// Reject a pending deposit
    pub async fn reject_deposit(&self, session: &Session, entry_id: &EntryId) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.reject_deposit(entry_id).await
    }

    /// Approve a pending withdrawal
    pub async fn approve_withdrawal(
        &self,
        session: &Session,
        entry_id: &EntryId,
    ) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.approve_withdrawal(entry_id).await
    }

    /// Reject a pending withdrawal, returning the held funds
    pub async fn reject_withdrawal(
        &self,
        session: &Session,
        entry_id: &EntryId,
    ) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        self.ops.reject_withdrawal(entry_id).await
    }

    /// Pending entries of a given type, oldest first
    pub async fn pending_entries(
        &self,
        session: &Session,
        entry_type: EntryType,
    ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>> {
        self.ensure_admin(session).await?;
        self.ops.pending_entries(entry_type).await
    }

    /// Replace the app settings document
    pub async fn save_settings(
        &self,
        session: &Session,
        settings: AppSettings,
    ) -> LedgerResult<()> {
        self.ensure_admin(session).await?;
        settings.validate()?;
        self.ops.update_settings(settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArenaClient<MemoryStore> {
        ArenaClient::new(Arc::new(MemoryStore::new()), LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_register_and_deposit_flow() {
        let client = client();
        let player = Session::user(UserId::from("u1"));
        let admin = Session::admin(UserId::from("op-1"));

        client
            .register(&player, "alice", "alice@example.com", None)
            .await
            .unwrap();
        let entry = client.request_deposit(&player, 500).await.unwrap();
        client.approve_deposit(&admin, &entry).await.unwrap();

        let wallet = client.wallet(&player).await.unwrap();
        assert_eq!(wallet.deposit, 500);
    }

    #[tokio::test]
    async fn test_admin_required_for_approvals() {
        let client = client();
        let player = Session::user(UserId::from("u1"));

        client
            .register(&player, "alice", "alice@example.com", None)
            .await
            .unwrap();
        let entry = client.request_deposit(&player, 500).await.unwrap();

        let err = client.approve_deposit(&player, &entry).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized));
    }

    #[tokio::test]
    async fn test_settings_allow_list_grants_admin() {
        let client = client();
        let operator = Session::user(UserId::from("op-1"));
        let bootstrap = Session::admin(UserId::from("root"));

        let mut settings = client.settings().await.unwrap();
        settings.admin_uids.push(UserId::from("op-1"));
        client.save_settings(&bootstrap, settings).await.unwrap();

        // Plain session, but allow-listed.
        let params = NewTournament {
            name: "Open Cup".to_string(),
            kind: TournamentKind::Solo,
            entry_fee: 10,
            prize_pool: 100,
            max_players: 16,
            start_time: Timestamp::now(),
            fee_priority: None,
            room_code: None,
            room_password: None,
        };
        assert!(client.create_tournament(&operator, params).await.is_ok());
    }

    #[tokio::test]
    async fn test_maintenance_blocks_participants() {
        let client = client();
        let admin = Session::admin(UserId::from("root"));
        let player = Session::user(UserId::from("u1"));

        client
            .register(&player, "alice", "alice@example.com", None)
            .await
            .unwrap();

        let mut settings = client.settings().await.unwrap();
        settings.maintenance_mode = true;
        client.save_settings(&admin, settings).await.unwrap();

        let err = client.request_deposit(&player, 100).await.unwrap_err();
        assert!(matches!(err, LedgerError::Maintenance));
        let err = client
            .join_tournament(&player, &TournamentId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Maintenance));

        // Admin surface stays available during maintenance.
        let mut settings = client.settings().await.unwrap();
        settings.maintenance_mode = false;
        client.save_settings(&admin, settings).await.unwrap();
        assert!(client.request_deposit(&player, 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_operations_rejected() {
        let client = client();
        let admin = Session::admin(UserId::from("root"));
        let player = Session::user(UserId::from("u1"));

        client
            .register(&player, "alice", "alice@example.com", None)
            .await
            .unwrap();

        let mut settings = client.settings().await.unwrap();
        settings.deposit_enabled = false;
        settings.withdrawal_enabled = false;
        client.save_settings(&admin, settings).await.unwrap();

        assert!(matches!(
            client.request_deposit(&player, 100).await.unwrap_err(),
            LedgerError::OperationDisabled("deposit")
        ));
        assert!(matches!(
            client.request_withdrawal(&player, 100).await.unwrap_err(),
            LedgerError::OperationDisabled("withdrawal")
        ));
    }

    #[tokio::test]
    async fn test_full_tournament_lifecycle() {
        let client = client();
        let admin = Session::admin(UserId::from("root"));
        let player = Session::user(UserId::from("u1"));

        client
            .register(&player, "alice", "alice@example.com", None)
            .await
            .unwrap();
        let deposit = client.request_deposit(&player, 100).await.unwrap();
        client.approve_deposit(&admin, &deposit).await.unwrap();

        let (tid, _) = client
            .create_tournament(
                &admin,
                NewTournament {
                    name: "Open Cup".to_string(),
                    kind: TournamentKind::Solo,
                    entry_fee: 40,
                    prize_pool: 100,
                    max_players: 16,
                    start_time: Timestamp::now(),
                    fee_priority: None,
                    room_code: None,
                    room_password: None,
                },
            )
            .await
            .unwrap();

        client.join_tournament(&player, &tid).await.unwrap();
        client
            .set_tournament_status(&admin, &tid, TournamentStatus::Ongoing)
            .await
            .unwrap();
        client
            .set_tournament_status(&admin, &tid, TournamentStatus::Finished)
            .await
            .unwrap();
        client
            .award_prize(&admin, &tid, &UserId::from("u1"), 100)
            .await
            .unwrap();

        let wallet = client.wallet(&player).await.unwrap();
        assert_eq!(wallet.deposit, 60);
        assert_eq!(wallet.winning, 100);

        // Withdraw the prize, then the operator rejects it.
        let withdrawal = client.request_withdrawal(&player, 100).await.unwrap();
        assert_eq!(client.wallet(&player).await.unwrap().winning, 0);
        client.reject_withdrawal(&admin, &withdrawal).await.unwrap();
        assert_eq!(client.wallet(&player).await.unwrap().winning, 100);
    }
}
