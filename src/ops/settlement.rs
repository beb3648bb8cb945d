//! Deposit and withdrawal settlement
//!
//! Participants raise pending ledger entries; an operator later approves or
//! rejects them. Withdrawals debit the winning bucket at request time, so an
//! approval only finalizes the entry while a rejection must return the held
//! funds. Rejected withdrawals are always refunded to the winning bucket,
//! regardless of which bucket originally funded the balance.

use tracing::{debug, info, warn};

use super::LedgerOps;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{LedgerStore, Write};
use crate::types::{
    generate_doc_id, Bucket, EntryId, EntryStatus, EntryType, LedgerEntry, UserId,
};

impl<S: LedgerStore> LedgerOps<S> {
    /// Raise a pending deposit request
    pub async fn request_deposit(&self, user_id: &UserId, amount: u64) -> LedgerResult<EntryId> {
        if amount == 0 {
            return Err(LedgerError::InvalidState(
                "deposit amount must be positive".to_string(),
            ));
        }
        self.storage()
            .get_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                collection: "users",
                id: user_id.to_string(),
            })?;

        let id = EntryId::new(generate_doc_id());
        let entry = LedgerEntry::pending(EntryType::Deposit, amount, user_id.clone());
        self.storage()
            .commit(vec![Write::Entry {
                id: id.clone(),
                doc: entry,
                expect: 0,
            }])
            .await?;
        info!(%user_id, amount, entry_id = %id, "deposit requested");
        Ok(id)
    }

    /// Raise a pending withdrawal request, holding the funds immediately.
    ///
    /// Only the winning bucket is withdrawable. The amount is debited here so
    /// it cannot be spent while the request awaits review.
    pub async fn request_withdrawal(&self, user_id: &UserId, amount: u64) -> LedgerResult<EntryId> {
        if amount == 0 {
            return Err(LedgerError::InvalidState(
                "withdrawal amount must be positive".to_string(),
            ));
        }

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
            new_user.wallet.debit(Bucket::Winning, amount)?;

            let id = EntryId::new(generate_doc_id());
            let entry = LedgerEntry::pending(EntryType::Withdrawal, amount, user_id.clone());
            let result = self
                .storage()
                .commit(vec![
                    Write::User {
                        id: user_id.clone(),
                        doc: new_user,
                        expect: user.version,
                    },
                    Write::Entry {
                        id: id.clone(),
                        doc: entry,
                        expect: 0,
                    },
                ])
                .await;
            match result {
                Ok(()) => {
                    info!(%user_id, amount, entry_id = %id, "withdrawal requested, funds held");
                    return Ok(id);
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(%user_id, attempt, "withdrawal request conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Approve a pending deposit, crediting the deposit bucket
    pub async fn approve_deposit(&self, entry_id: &EntryId) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = self.read_entry(entry_id, EntryType::Deposit).await?;
            let user = self
                .storage()
                .get_user(&entry.doc.user_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound {
                    collection: "users",
                    id: entry.doc.user_id.to_string(),
                })?;

            let mut new_entry = entry.doc.clone();
            new_entry.mark_completed()?;
            let mut new_user = user.doc.clone();
            new_user.wallet.credit(Bucket::Deposit, new_entry.amount);

            let result = self
                .storage()
                .commit(vec![
                    Write::Entry {
                        id: entry_id.clone(),
                        doc: new_entry,
                        expect: entry.version,
                    },
                    Write::User {
                        id: entry.doc.user_id.clone(),
                        doc: new_user,
                        expect: user.version,
                    },
                ])
                .await;
            match result {
                Ok(()) => {
                    info!(entry_id = %entry_id, amount = entry.doc.amount, "deposit approved");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(entry_id = %entry_id, attempt, "deposit approval conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reject a pending deposit; nothing was held, so no wallet change
    pub async fn reject_deposit(&self, entry_id: &EntryId) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = self.read_entry(entry_id, EntryType::Deposit).await?;
            let mut new_entry = entry.doc.clone();
            new_entry.mark_rejected()?;

            let result = self
                .storage()
                .commit(vec![Write::Entry {
                    id: entry_id.clone(),
                    doc: new_entry,
                    expect: entry.version,
                }])
                .await;
            match result {
                Ok(()) => {
                    info!(entry_id = %entry_id, "deposit rejected");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(entry_id = %entry_id, attempt, "deposit rejection conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Approve a pending withdrawal; the funds were held at request time
    pub async fn approve_withdrawal(&self, entry_id: &EntryId) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = self.read_entry(entry_id, EntryType::Withdrawal).await?;
            let mut new_entry = entry.doc.clone();
            new_entry.mark_completed()?;

            let result = self
                .storage()
                .commit(vec![Write::Entry {
                    id: entry_id.clone(),
                    doc: new_entry,
                    expect: entry.version,
                }])
                .await;
            match result {
                Ok(()) => {
                    info!(entry_id = %entry_id, amount = entry.doc.amount, "withdrawal approved");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(entry_id = %entry_id, attempt, "withdrawal approval conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reject a pending withdrawal, returning the held funds.
    ///
    /// The refund is credited to the winning bucket. The status transition
    /// guard makes the reversal idempotent: a second rejection fails before
    /// any credit is computed, so the refund can never be applied twice.
    pub async fn reject_withdrawal(&self, entry_id: &EntryId) -> LedgerResult<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let entry = self.read_entry(entry_id, EntryType::Withdrawal).await?;
            let user = self
                .storage()
                .get_user(&entry.doc.user_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound {
                    collection: "users",
                    id: entry.doc.user_id.to_string(),
                })?;

            let mut new_entry = entry.doc.clone();
            new_entry.mark_rejected()?;
            let mut new_user = user.doc.clone();
            new_user.wallet.credit(Bucket::Winning, new_entry.amount);

            let result = self
                .storage()
                .commit(vec![
                    Write::Entry {
                        id: entry_id.clone(),
                        doc: new_entry,
                        expect: entry.version,
                    },
                    Write::User {
                        id: entry.doc.user_id.clone(),
                        doc: new_user,
                        expect: user.version,
                    },
                ])
                .await;
            match result {
                Ok(()) => {
                    warn!(entry_id = %entry_id, amount = entry.doc.amount, "withdrawal rejected, funds returned");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(entry_id = %entry_id, attempt, "withdrawal rejection conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Pending entries of a given type, oldest first
    pub async fn pending_entries(
        &self,
        entry_type: EntryType,
    ) -> LedgerResult<Vec<(EntryId, LedgerEntry)>> {
        self.storage()
            .list_entries(entry_type, EntryStatus::Pending)
            .await
    }

    async fn read_entry(
        &self,
        entry_id: &EntryId,
        expected_type: EntryType,
    ) -> LedgerResult<crate::storage::Versioned<LedgerEntry>> {
        let entry = self.storage().get_entry(entry_id).await?.ok_or_else(|| {
            LedgerError::NotFound {
                collection: "transactions",
                id: entry_id.to_string(),
            }
        })?;
        if entry.doc.entry_type != expected_type {
            return Err(LedgerError::InvalidState(format!(
                "entry {} is a {}, not a {}",
                entry_id, entry.doc.entry_type, expected_type
            )));
        }
        Ok(entry)
    }
}
