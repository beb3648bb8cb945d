//! User document

use serde::{Deserialize, Serialize};

use super::common::{generate_referral_code, Timestamp, UserId};
use super::wallet::Wallet;
use crate::error::{LedgerError, LedgerResult};

/// User document, owning exactly one wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub wallet: Wallet,
    /// Unique code other users may enter at signup
    pub referral_code: String,
    /// Referrer link; set at most once, never overwritten
    #[serde(default)]
    pub referred_by: Option<UserId>,
    pub created_at: Timestamp,
}

impl User {
    /// Fresh user with a zeroed wallet and a generated referral code
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            wallet: Wallet::zero(),
            referral_code: generate_referral_code(),
            referred_by: None,
            created_at: Timestamp::now(),
        }
    }

    /// Validate the document shape at the store boundary
    pub fn validate(&self) -> LedgerResult<()> {
        if self.username.is_empty() {
            return Err(LedgerError::MalformedDocument(
                "username is empty".to_string(),
            ));
        }
        if self.email.is_empty() {
            return Err(LedgerError::MalformedDocument("email is empty".to_string()));
        }
        if self.referral_code.is_empty() {
            return Err(LedgerError::MalformedDocument(
                "referral code is empty".to_string(),
            ));
        }
        Ok(())
    }
}
