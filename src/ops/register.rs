//! User registration and referral linking

use tracing::{debug, info, warn};

use super::LedgerOps;
use crate::error::{LedgerError, LedgerResult};
use crate::storage::{LedgerStore, Write};
use crate::types::{User, UserId};

impl<S: LedgerStore> LedgerOps<S> {
    /// Register a new user, optionally linking a referrer.
    ///
    /// An unknown or self-owned referral code does not fail registration; it
    /// is logged and ignored, matching how signup forms treat a mistyped code.
    pub async fn register_user(
        &self,
        user_id: &UserId,
        username: &str,
        email: &str,
        referral_code: Option<&str>,
    ) -> LedgerResult<User> {
        if self.storage().get_user(user_id).await?.is_some() {
            return Err(LedgerError::InvalidState(format!(
                "user {user_id} already registered"
            )));
        }

        let mut user = User::new(username, email);
        if let Some(code) = referral_code {
            match self.storage().find_user_by_referral_code(code).await? {
                Some((referrer_id, _)) if referrer_id != *user_id => {
                    user.referred_by = Some(referrer_id);
                }
                Some(_) => {
                    warn!(%user_id, code, "self-referral ignored");
                }
                None => {
                    warn!(%user_id, code, "unknown referral code ignored");
                }
            }
        }

        let result = self
            .storage()
            .commit(vec![Write::User {
                id: user_id.clone(),
                doc: user.clone(),
                expect: 0,
            }])
            .await;
        match result {
            Ok(()) => {
                info!(%user_id, username, "user registered");
                Ok(user)
            }
            // A racing registration for the same id is a duplicate, not
            // something to retry.
            Err(e) if e.is_retriable() => Err(LedgerError::InvalidState(format!(
                "user {user_id} already registered"
            ))),
            Err(e) => Err(e),
        }
    }

    /// Link a referrer to an existing user via their referral code.
    ///
    /// A user's referrer can be set at most once.
    pub async fn link_referral(&self, user_id: &UserId, code: &str) -> LedgerResult<()> {
        let (referrer_id, _) = self
            .storage()
            .find_user_by_referral_code(code)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                collection: "users",
                id: code.to_string(),
            })?;
        if referrer_id == *user_id {
            return Err(LedgerError::InvalidState(
                "cannot use own referral code".to_string(),
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
            if user.doc.referred_by.is_some() {
                return Err(LedgerError::InvalidState(
                    "referrer already linked".to_string(),
                ));
            }

            let mut new_user = user.doc.clone();
            new_user.referred_by = Some(referrer_id.clone());

            let result = self
                .storage()
                .commit(vec![Write::User {
                    id: user_id.clone(),
                    doc: new_user,
                    expect: user.version,
                }])
                .await;
            match result {
                Ok(()) => {
                    info!(%user_id, %referrer_id, "referral linked");
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt < self.config().max_txn_attempts => {
                    debug!(%user_id, attempt, "referral link conflicted, retrying");
                }
                Err(e) if e.is_retriable() => {
                    return Err(LedgerError::Contention { attempts: attempt });
                }
                Err(e) => return Err(e),
            }
        }
    }
}
