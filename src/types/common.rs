//! Shared base types
//!
//! Identifiers, timestamps, and id/code generation used across modules.

use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Stable user identifier supplied by the identity provider
    UserId
);
string_id!(
    /// Tournament document identifier
    TournamentId
);
string_id!(
    /// Ledger entry document identifier
    EntryId
);

/// Timestamp type (Unix milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current wall-clock timestamp
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as u64)
    }

    /// Create from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Convert to milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Whether the timestamp is unset
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped session context.
///
/// Threaded explicitly through every client call in place of any process-wide
/// "current user" state. The `admin` flag carries the identity provider's
/// capability claim; the allow-list in [`AppSettings`](super::AppSettings) is
/// the second accepted source of the capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Authenticated user identifier
    pub user_id: UserId,
    /// Admin capability claim from the identity provider
    pub admin: bool,
}

impl Session {
    /// Session for a regular participant
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: false,
        }
    }

    /// Session carrying the admin claim
    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: true,
        }
    }
}

fn entropy_digest() -> [u8; 32] {
    let mut hasher = Sha256::new();

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());

    let thread_id = format!("{:?}", std::thread::current().id());
    hasher.update(thread_id.as_bytes());

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Generate a random document id (20 hex characters)
pub fn generate_doc_id() -> String {
    hex::encode(&entropy_digest()[..10])
}

const REFERRAL_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Referral code length in characters
pub const REFERRAL_CODE_LEN: usize = 6;

/// Generate a 6-character uppercase alphanumeric referral code
pub fn generate_referral_code() -> String {
    entropy_digest()
        .iter()
        .take(REFERRAL_CODE_LEN)
        .map(|b| REFERRAL_CHARSET[*b as usize % REFERRAL_CHARSET.len()] as char)
        .collect()
}
