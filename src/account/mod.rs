//! Account subsystem: record types, credential hashing, and the
//! credential store that owns every live account.

pub mod auth;
pub mod store;
pub mod types;

pub use store::{CredentialStore, NewAccount, StoreError};
pub use types::{current_unix_timestamp_ms, Account, AccountId, AccountStatus};
