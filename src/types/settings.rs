//! App settings document
//!
//! Process-wide settings owned by the admin side: the default join-fee spend
//! order, the maintenance flag, deposit/withdrawal toggles, and the admin
//! allow-list.

use serde::{Deserialize, Serialize};

use super::common::UserId;
use super::wallet::{validate_priority, Bucket, DEFAULT_JOIN_FEE_PRIORITY};
use crate::error::LedgerResult;

/// App settings document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Default spend order for entry fees
    #[serde(default = "default_priority")]
    pub default_join_fee_priority: [Bucket; 3],
    /// While set, participant-facing operations are refused at the boundary
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default = "default_true")]
    pub deposit_enabled: bool,
    #[serde(default = "default_true")]
    pub withdrawal_enabled: bool,
    /// Identifiers granted the admin capability in addition to provider claims
    #[serde(default)]
    pub admin_uids: Vec<UserId>,
}

fn default_app_name() -> String {
    "Arena".to_string()
}

fn default_priority() -> [Bucket; 3] {
    DEFAULT_JOIN_FEE_PRIORITY
}

fn default_true() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            default_join_fee_priority: DEFAULT_JOIN_FEE_PRIORITY,
            maintenance_mode: false,
            deposit_enabled: true,
            withdrawal_enabled: true,
            admin_uids: Vec::new(),
        }
    }
}

impl AppSettings {
    /// Whether the allow-list grants `user_id` the admin capability
    pub fn is_admin(&self, user_id: &UserId) -> bool {
        self.admin_uids.contains(user_id)
    }

    /// Validate the document shape at the store boundary
    pub fn validate(&self) -> LedgerResult<()> {
        validate_priority(&self.default_join_fee_priority)
    }
}
