//! Error taxonomy for directory operations.
//!
//! Validation failures are rejected before touching storage, conflicts
//! are rejected atomically, and storage-layer failures surface as the
//! generic `Unavailable` condition, never disguised as validation or
//! authorization failures.

use thiserror::Error;

use crate::account::StoreError;

#[derive(Error, Debug)]
pub enum DirectoryError {
    // Validation
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("'ids' must be a non-empty array")]
    EmptyIds,

    // Conflict
    #[error("email is already in use")]
    DuplicateEmail,
    #[error("an account may not block itself")]
    SelfBlock,

    // Authorization
    #[error("account is blocked")]
    Blocked,
    #[error("wrong password")]
    BadCredential,
    #[error("forbidden")]
    Forbidden,

    // Not found
    #[error("email not registered")]
    NotRegistered,

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => DirectoryError::DuplicateEmail,
            StoreError::NotFound => DirectoryError::NotRegistered,
            StoreError::Persistence(msg) => DirectoryError::Unavailable(msg),
        }
    }
}
