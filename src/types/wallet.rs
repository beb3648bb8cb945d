//! Wallet document
//!
//! Per-user balance record with three independently tracked buckets. Amounts
//! are unsigned, so bucket non-negativity is structural; debits use checked
//! arithmetic and fail on shortfall instead of wrapping.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, LedgerResult};

/// One of the wallet's sub-balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Funds added via approved deposits
    Deposit,
    /// Funds from tournament prizes or refunds
    Winning,
    /// Promotional funds
    Bonus,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Winning => write!(f, "winning"),
            Self::Bonus => write!(f, "bonus"),
        }
    }
}

/// Default spend order when no tournament-specific override exists
pub const DEFAULT_JOIN_FEE_PRIORITY: [Bucket; 3] = [Bucket::Winning, Bucket::Bonus, Bucket::Deposit];

/// Per-user wallet with three sub-balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Wallet {
    pub deposit: u64,
    pub winning: u64,
    pub bonus: u64,
}

impl Wallet {
    /// Empty wallet
    pub fn zero() -> Self {
        Self::default()
    }

    /// Total balance across all buckets, saturating at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.deposit
            .saturating_add(self.winning)
            .saturating_add(self.bonus)
    }

    /// Balance of a single bucket
    pub fn balance(&self, bucket: Bucket) -> u64 {
        match bucket {
            Bucket::Deposit => self.deposit,
            Bucket::Winning => self.winning,
            Bucket::Bonus => self.bonus,
        }
    }

    fn bucket_mut(&mut self, bucket: Bucket) -> &mut u64 {
        match bucket {
            Bucket::Deposit => &mut self.deposit,
            Bucket::Winning => &mut self.winning,
            Bucket::Bonus => &mut self.bonus,
        }
    }

    /// Credit a bucket, saturating instead of wrapping
    pub fn credit(&mut self, bucket: Bucket, amount: u64) {
        let balance = self.bucket_mut(bucket);
        *balance = balance.saturating_add(amount);
    }

    /// Debit a bucket, failing on shortfall
    pub fn debit(&mut self, bucket: Bucket, amount: u64) -> LedgerResult<()> {
        let balance = self.bucket_mut(bucket);
        *balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds {
                required: amount,
                available: *balance,
            })?;
        Ok(())
    }
}

/// Validate that a priority list names exactly three distinct buckets
pub fn validate_priority(priority: &[Bucket]) -> LedgerResult<()> {
    if priority.len() != 3 {
        return Err(LedgerError::MalformedDocument(format!(
            "fee priority must name 3 buckets, got {}",
            priority.len()
        )));
    }
    for (i, bucket) in priority.iter().enumerate() {
        if priority[..i].contains(bucket) {
            return Err(LedgerError::MalformedDocument(format!(
                "fee priority repeats bucket {bucket}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_sum_of_buckets() {
        let wallet = Wallet {
            deposit: 50,
            winning: 30,
            bonus: 5,
        };
        assert_eq!(wallet.total(), 85);
        assert_eq!(wallet.balance(Bucket::Winning), 30);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut wallet = Wallet::zero();
        wallet.credit(Bucket::Bonus, 25);
        assert_eq!(wallet.bonus, 25);

        wallet.debit(Bucket::Bonus, 10).unwrap();
        assert_eq!(wallet.bonus, 15);
    }

    #[test]
    fn test_debit_shortfall_fails_without_mutation() {
        let mut wallet = Wallet {
            deposit: 5,
            winning: 0,
            bonus: 0,
        };
        let err = wallet.debit(Bucket::Deposit, 10).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                required: 10,
                available: 5
            }
        ));
        assert_eq!(wallet.deposit, 5);
    }

    #[test]
    fn test_credit_saturates_instead_of_wrapping() {
        let mut wallet = Wallet {
            deposit: u64::MAX - 5,
            winning: u64::MAX,
            bonus: 0,
        };
        wallet.credit(Bucket::Deposit, 10);
        assert_eq!(wallet.deposit, u64::MAX);
        assert_eq!(wallet.total(), u64::MAX);
    }

    #[test]
    fn test_validate_priority() {
        assert!(validate_priority(&DEFAULT_JOIN_FEE_PRIORITY).is_ok());
        assert!(validate_priority(&[Bucket::Winning, Bucket::Bonus]).is_err());
        assert!(validate_priority(&[Bucket::Winning, Bucket::Winning, Bucket::Bonus]).is_err());
    }

    #[test]
    fn test_bucket_serde_names() {
        let json = serde_json::to_string(&Bucket::Winning).unwrap();
        assert_eq!(json, "\"winning\"");
    }
}
