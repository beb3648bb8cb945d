//! Fee allocation engine
//!
//! Pure computation of how an entry fee is split across the wallet's buckets.
//! Allocation walks the configured spend order, taking from each bucket until
//! the fee is covered. The result is all-or-nothing: either a complete
//! [`FeePlan`] or [`LedgerError::InsufficientFunds`], never a partial plan.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{Bucket, Wallet};

/// Per-bucket deduction plan covering a required fee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePlan {
    deductions: Vec<(Bucket, u64)>,
    total: u64,
}

impl FeePlan {
    /// Per-bucket deductions, in consumption order; zero deductions omitted
    pub fn deductions(&self) -> &[(Bucket, u64)] {
        &self.deductions
    }

    /// Sum of all deductions; equals the fee that was allocated
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the plan touches no bucket (fee of zero)
    pub fn is_empty(&self) -> bool {
        self.deductions.is_empty()
    }

    /// Amount taken from a single bucket
    pub fn deduction_for(&self, bucket: Bucket) -> u64 {
        self.deductions
            .iter()
            .find(|(b, _)| *b == bucket)
            .map(|(_, amount)| *amount)
            .unwrap_or(0)
    }

    /// Apply the plan to a wallet, debiting each bucket
    pub fn apply(&self, wallet: &mut Wallet) -> LedgerResult<()> {
        for (bucket, amount) in &self.deductions {
            wallet.debit(*bucket, *amount)?;
        }
        Ok(())
    }
}

/// Compute a deduction plan covering `fee` from `wallet` in `priority` order.
///
/// Deterministic: the same inputs always yield the same plan. A fee of zero
/// yields an empty plan. Fails with `InsufficientFunds` when the listed
/// buckets together cannot cover the fee.
pub fn allocate(fee: u64, priority: &[Bucket], wallet: &Wallet) -> LedgerResult<FeePlan> {
    let mut remaining = fee;
    let mut scratch = *wallet;
    let mut deductions = Vec::new();

    for bucket in priority {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(scratch.balance(*bucket));
        if take > 0 {
            scratch.debit(*bucket, take)?;
            deductions.push((*bucket, take));
            remaining -= take;
        }
    }

    if remaining > 0 {
        return Err(LedgerError::InsufficientFunds {
            required: fee,
            available: fee - remaining,
        });
    }

    Ok(FeePlan {
        deductions,
        total: fee,
    })
}
