//! Credential store: the single writer-serialized home of account records.
//!
//! One mutex over the whole working set makes every bulk operation an
//! atomic set-based step and serializes identifier-space compaction
//! against concurrent creation. Persistence is write-through to an
//! optional embedded backend; the in-memory map is authoritative.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::types::{Account, AccountId, AccountStatus};
use crate::storage::Storage;

/// Lowest identifier handed out; compaction resets allocation here.
const FIRST_ID: AccountId = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email is already in use")]
    DuplicateEmail,
    #[error("account not found")]
    NotFound,
    #[error("persistence error: {0}")]
    Persistence(String),
}

/// Inputs for a new record; the store assigns the id.
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: u64,
}

struct StoreInner {
    accounts: BTreeMap<AccountId, Account>,
    next_id: AccountId,
}

pub struct CredentialStore {
    inner: Mutex<StoreInner>,
    storage: Option<Arc<Storage>>,
}

impl CredentialStore {
    /// Open the store, reloading any persisted accounts. Id allocation
    /// resumes above the highest live id.
    pub fn open(storage: Option<Arc<Storage>>) -> Result<Self, StoreError> {
        let mut accounts = BTreeMap::new();
        if let Some(storage) = &storage {
            for account in storage
                .load_accounts()
                .map_err(|e| StoreError::Persistence(e.to_string()))?
            {
                accounts.insert(account.id, account);
            }
        }
        let next_id = accounts
            .keys()
            .next_back()
            .map(|id| id + 1)
            .unwrap_or(FIRST_ID);

        Ok(Self {
            inner: Mutex::new(StoreInner { accounts, next_id }),
            storage,
        })
    }

    /// In-memory store with no persistence.
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                accounts: BTreeMap::new(),
                next_id: FIRST_ID,
            }),
            storage: None,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Persistence("store lock poisoned".to_string()))
    }

    fn persist(&self, account: &Account) -> Result<(), StoreError> {
        if let Some(storage) = &self.storage {
            storage
                .save_account(account)
                .map_err(|e| StoreError::Persistence(e.to_string()))?;
        }
        Ok(())
    }

    /// Create a new account record with a fresh unique id.
    pub fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.lock()?;

        if inner.accounts.values().any(|a| a.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let id = inner.next_id;
        let account = Account {
            id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            status: AccountStatus::Active,
            last_authenticated_at: None,
            session_token: None,
            created_at: new.created_at,
        };

        self.persist(&account)?;
        inner.next_id = id + 1;
        inner.accounts.insert(id, account.clone());
        Ok(account)
    }

    pub fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let inner = self.lock()?;
        inner
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Look up the account whose stored session token matches. Only the
    /// most-recently-issued token per account can match.
    pub fn find_by_token(&self, token: &str) -> Result<Account, StoreError> {
        let inner = self.lock()?;
        inner
            .accounts
            .values()
            .find(|a| a.session_token.as_deref() == Some(token))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub fn set_session_token(&self, id: AccountId, token: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.session_token = Some(token.to_string());
        let snapshot = account.clone();
        drop(inner);
        self.persist(&snapshot)
    }

    pub fn touch_last_authenticated(&self, id: AccountId, at_ms: u64) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let account = inner.accounts.get_mut(&id).ok_or(StoreError::NotFound)?;
        account.last_authenticated_at = Some(at_ms);
        let snapshot = account.clone();
        drop(inner);
        self.persist(&snapshot)
    }

    /// Set `status` on every matching live record in one atomic step.
    /// Unknown ids are ignored, not errors. Returns the affected count.
    pub fn update_status(
        &self,
        ids: &[AccountId],
        status: AccountStatus,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut touched = Vec::new();
        for id in dedup(ids) {
            if let Some(account) = inner.accounts.get_mut(&id) {
                account.status = status;
                touched.push(account.clone());
            }
        }
        let affected = touched.len();
        drop(inner);
        for account in &touched {
            self.persist(account)?;
        }
        Ok(affected)
    }

    /// Remove every matching live record. Returns the affected count.
    pub fn delete(&self, ids: &[AccountId]) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut removed = Vec::new();
        for id in dedup(ids) {
            if inner.accounts.remove(&id).is_some() {
                removed.push(id);
            }
        }
        let affected = removed.len();
        drop(inner);
        if let Some(storage) = &self.storage {
            for id in removed {
                storage
                    .remove_account(id)
                    .map_err(|e| StoreError::Persistence(e.to_string()))?;
            }
        }
        Ok(affected)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.accounts.len())
    }

    pub fn all(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.lock()?.accounts.values().cloned().collect())
    }

    /// Reset future-id allocation to the minimum. Holds the same lock as
    /// `create`, so a compaction can never race a registration onto a
    /// duplicate id; on a non-empty store this is a no-op.
    pub fn compact_identifier_space(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner.accounts.is_empty() {
            inner.next_id = FIRST_ID;
        }
        Ok(())
    }
}

fn dedup(ids: &[AccountId]) -> Vec<AccountId> {
    let mut out = ids.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}
