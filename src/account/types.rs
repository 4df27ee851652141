//! Account type definitions

use serde::{Deserialize, Serialize};

/// Account identifier - monotonically assigned, starts at 1
pub type AccountId = u64;

/// Lifecycle status of a live account. Deleted accounts are removed
/// from the store entirely, never flagged.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Blocked,
}

/// A registered account record.
///
/// Only the `AccountDirectory` mutates these; everything else reads.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,

    /// Argon2id PHC string. The plaintext credential is never stored.
    pub password_hash: String,

    pub status: AccountStatus,

    /// Unix ms of the last successful authentication, `None` = never.
    pub last_authenticated_at: Option<u64>,

    /// Most-recently-issued session token. A presented token must match
    /// this to pass the session guard's membership check.
    pub session_token: Option<String>,

    pub created_at: u64,
}

impl Account {
    pub fn is_blocked(&self) -> bool {
        self.status == AccountStatus::Blocked
    }
}

/// Current unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
