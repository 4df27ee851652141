//! Embedded persistence backend for the credential store.
//!
//! Accounts are stored under `account:<id>` keys with bincode-encoded
//! values. The in-memory store is authoritative; this is write-through.

use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::account::Account;

const ACCOUNT_PREFIX: &str = "account:";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub struct Storage {
    db: sled::Db,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Storage { db })
    }

    // Generic Helper: Put
    fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let serialized =
            bincode::serialize(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.db.insert(key.as_bytes(), serialized)?;
        Ok(())
    }

    // Generic Helper: Get
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(data) => {
                let deserialized = bincode::deserialize(&data)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    // --- Account Accessors ---

    pub fn save_account(&self, account: &Account) -> Result<(), StorageError> {
        self.put(&format!("{}{}", ACCOUNT_PREFIX, account.id), account)
    }

    pub fn remove_account(&self, id: u64) -> Result<(), StorageError> {
        self.db
            .remove(format!("{}{}", ACCOUNT_PREFIX, id).as_bytes())?;
        Ok(())
    }

    pub fn load_account(&self, id: u64) -> Result<Option<Account>, StorageError> {
        self.get(&format!("{}{}", ACCOUNT_PREFIX, id))
    }

    /// Scan all persisted accounts. Used once at startup to rebuild the
    /// in-memory working set.
    pub fn load_accounts(&self) -> Result<Vec<Account>, StorageError> {
        let mut accounts = Vec::new();
        for entry in self.db.scan_prefix(ACCOUNT_PREFIX.as_bytes()) {
            let (_, value) = entry?;
            let account: Account = bincode::deserialize(&value)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            accounts.push(account);
        }
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;

    fn sample(id: u64) -> Account {
        Account {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: "$argon2id$stub".to_string(),
            status: AccountStatus::Active,
            last_authenticated_at: None,
            session_token: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_save_load_remove_roundtrip() {
        let dir = std::env::temp_dir().join(format!(
            "roster-storage-{}-{}",
            std::process::id(),
            crate::account::current_unix_timestamp_ms()
        ));
        let storage = Storage::open(&dir).unwrap();

        storage.save_account(&sample(1)).unwrap();
        storage.save_account(&sample(2)).unwrap();

        let loaded = storage.load_account(1).unwrap().unwrap();
        assert_eq!(loaded.email, "user1@example.com");

        assert_eq!(storage.load_accounts().unwrap().len(), 2);

        storage.remove_account(1).unwrap();
        assert!(storage.load_account(1).unwrap().is_none());
        assert_eq!(storage.load_accounts().unwrap().len(), 1);

        drop(storage);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
