//! Account directory: orchestrates registration, authentication, and
//! bulk status transitions, and enforces the self-protection invariants.
//!
//! All record mutation funnels through here. The store guarantees
//! atomicity of each bulk step; this layer owns the policy: which
//! transitions exist, in what order checks run, and which failures are
//! swallowed as best-effort housekeeping.

use std::sync::Arc;
use tracing::{info, warn};

use crate::account::{
    auth, current_unix_timestamp_ms, Account, AccountId, AccountStatus, CredentialStore,
    NewAccount,
};
use crate::error::DirectoryError;
use crate::token::TokenIssuer;

#[derive(Debug)]
pub struct Registration {
    pub account_id: AccountId,
    pub token: String,
}

#[derive(Debug)]
pub struct Authentication {
    pub account_id: AccountId,
    pub token: String,
    pub status: AccountStatus,
}

#[derive(Debug)]
pub struct Deletion {
    pub affected: usize,
    /// The requester deleted their own account; the caller must treat
    /// its session as invalid from here on.
    pub self_deleted: bool,
}

pub struct AccountDirectory {
    store: Arc<CredentialStore>,
    issuer: TokenIssuer,
}

impl AccountDirectory {
    pub fn new(store: Arc<CredentialStore>, issuer: TokenIssuer) -> Self {
        Self { store, issuer }
    }

    /// Register a new account. Validation runs before any storage is
    /// touched; the new account starts `Active` with a freshly issued
    /// session token already persisted.
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Registration, DirectoryError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(DirectoryError::MissingField("username"));
        }
        if email.is_empty() {
            return Err(DirectoryError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(DirectoryError::MissingField("password"));
        }

        let password_hash = auth::hash_password(password)
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        let account = self.store.create(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: current_unix_timestamp_ms(),
        })?;

        let token = self
            .issuer
            .issue(account.id, &account.email, None)
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        self.store.set_session_token(account.id, &token)?;

        info!(account_id = account.id, "registered new account");
        Ok(Registration {
            account_id: account.id,
            token,
        })
    }

    /// Authenticate a credential pair and issue a fresh session token.
    ///
    /// Check order matches the contract: unknown email, then blocked
    /// status, then credential mismatch. The last-authentication
    /// timestamp update is best-effort and never fails the login.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Authentication, DirectoryError> {
        let account = self.store.find_by_email(email)?;

        if account.is_blocked() {
            return Err(DirectoryError::Blocked);
        }

        auth::verify_password(password, &account.password_hash)
            .map_err(|_| DirectoryError::BadCredential)?;

        let token = self
            .issuer
            .issue(account.id, &account.email, None)
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        self.store.set_session_token(account.id, &token)?;

        if let Err(err) = self
            .store
            .touch_last_authenticated(account.id, current_unix_timestamp_ms())
        {
            warn!(
                account_id = account.id,
                %err,
                "failed to record last-authentication time"
            );
        }

        info!(account_id = account.id, "authenticated");
        Ok(Authentication {
            account_id: account.id,
            token,
            status: account.status,
        })
    }

    /// All live accounts, most recently authenticated first. Accounts
    /// that never authenticated sort last; ties break on ascending id so
    /// the listing is deterministic. Read-only.
    pub fn list(&self) -> Result<Vec<Account>, DirectoryError> {
        let mut accounts = self.store.all()?;
        accounts.sort_by(|a, b| {
            b.last_authenticated_at
                .cmp(&a.last_authenticated_at)
                .then(a.id.cmp(&b.id))
        });
        Ok(accounts)
    }

    /// Block every listed account. Rejected atomically with `SelfBlock`
    /// if the requester is in the set: an operator may never revoke
    /// their own access through a bulk operation.
    pub fn block(
        &self,
        requester_id: AccountId,
        ids: &[AccountId],
    ) -> Result<usize, DirectoryError> {
        if ids.is_empty() {
            return Err(DirectoryError::EmptyIds);
        }
        if ids.contains(&requester_id) {
            return Err(DirectoryError::SelfBlock);
        }

        let affected = self.store.update_status(ids, AccountStatus::Blocked)?;
        info!(requester_id, affected, "blocked accounts");
        Ok(affected)
    }

    /// Unblock every listed account. No self-protection check applies;
    /// unblocking can never lock anyone out.
    pub fn unblock(&self, ids: &[AccountId]) -> Result<usize, DirectoryError> {
        if ids.is_empty() {
            return Err(DirectoryError::EmptyIds);
        }
        let affected = self.store.update_status(ids, AccountStatus::Active)?;
        info!(affected, "unblocked accounts");
        Ok(affected)
    }

    /// Delete every listed account. A requester may delete themselves;
    /// the response flags it so the caller forces a logout, and the rest
    /// of the set is still deleted. When the directory empties out, the
    /// identifier space is compacted as best-effort housekeeping.
    pub fn delete(
        &self,
        requester_id: AccountId,
        ids: &[AccountId],
    ) -> Result<Deletion, DirectoryError> {
        if ids.is_empty() {
            return Err(DirectoryError::EmptyIds);
        }

        let self_deleted = ids.contains(&requester_id);
        let affected = self.store.delete(ids)?;

        if self.store.count()? == 0 {
            // The store re-checks emptiness under its own lock, so a
            // racing registration cannot be handed a stale id.
            if let Err(err) = self.store.compact_identifier_space() {
                warn!(%err, "identifier-space compaction failed");
            }
        }

        info!(requester_id, affected, self_deleted, "deleted accounts");
        Ok(Deletion {
            affected,
            self_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::DEFAULT_TTL_MS;

    fn directory() -> AccountDirectory {
        let store = Arc::new(CredentialStore::in_memory());
        let issuer = TokenIssuer::new(b"test-secret-test-secret-32-bytes".to_vec(), DEFAULT_TTL_MS);
        AccountDirectory::new(store, issuer)
    }

    fn register(dir: &AccountDirectory, n: u32) -> Registration {
        dir.register(
            &format!("user{}", n),
            &format!("user{}@example.com", n),
            "correct horse battery",
        )
        .unwrap()
    }

    #[test]
    fn test_register_requires_all_fields() {
        let dir = directory();
        assert!(matches!(
            dir.register("", "a@example.com", "pw").unwrap_err(),
            DirectoryError::MissingField("username")
        ));
        assert!(matches!(
            dir.register("a", "", "pw").unwrap_err(),
            DirectoryError::MissingField("email")
        ));
        assert!(matches!(
            dir.register("a", "a@example.com", "").unwrap_err(),
            DirectoryError::MissingField("password")
        ));
        assert_eq!(dir.list().unwrap().len(), 0);
    }

    #[test]
    fn test_duplicate_registration_leaves_one_account() {
        let dir = directory();
        register(&dir, 1);
        let err = dir
            .register("other", "user1@example.com", "pw")
            .unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateEmail));
        assert_eq!(dir.list().unwrap().len(), 1);
    }

    #[test]
    fn test_authenticate_flows() {
        let dir = directory();
        let reg = register(&dir, 1);

        let auth = dir
            .authenticate("user1@example.com", "correct horse battery")
            .unwrap();
        assert_eq!(auth.account_id, reg.account_id);
        assert_eq!(auth.status, AccountStatus::Active);
        // Login replaces the registration token
        assert_ne!(auth.token, reg.token);

        assert!(matches!(
            dir.authenticate("nobody@example.com", "pw").unwrap_err(),
            DirectoryError::NotRegistered
        ));
        assert!(matches!(
            dir.authenticate("user1@example.com", "wrong").unwrap_err(),
            DirectoryError::BadCredential
        ));
    }

    #[test]
    fn test_blocked_account_cannot_authenticate() {
        let dir = directory();
        let operator = register(&dir, 1);
        let victim = register(&dir, 2);

        dir.block(operator.account_id, &[victim.account_id]).unwrap();
        assert!(matches!(
            dir.authenticate("user2@example.com", "correct horse battery")
                .unwrap_err(),
            DirectoryError::Blocked
        ));
    }

    #[test]
    fn test_self_block_rejected_atomically() {
        let dir = directory();
        let a = register(&dir, 1);
        let b = register(&dir, 2);

        let err = dir.block(a.account_id, &[a.account_id, b.account_id]).unwrap_err();
        assert!(matches!(err, DirectoryError::SelfBlock));

        // Nothing changed, not even the non-self id
        for account in dir.list().unwrap() {
            assert_eq!(account.status, AccountStatus::Active);
        }
    }

    #[test]
    fn test_block_then_list_shows_blocked() {
        let dir = directory();
        let op = register(&dir, 1);
        let b = register(&dir, 2);
        let c = register(&dir, 3);

        assert_eq!(dir.block(op.account_id, &[b.account_id, c.account_id]).unwrap(), 2);

        let rows = dir.list().unwrap();
        let status_of = |id| rows.iter().find(|a| a.id == id).unwrap().status;
        assert_eq!(status_of(op.account_id), AccountStatus::Active);
        assert_eq!(status_of(b.account_id), AccountStatus::Blocked);
        assert_eq!(status_of(c.account_id), AccountStatus::Blocked);

        assert_eq!(dir.unblock(&[b.account_id]).unwrap(), 1);
        let rows = dir.list().unwrap();
        assert_eq!(
            rows.iter().find(|a| a.id == b.account_id).unwrap().status,
            AccountStatus::Active
        );
    }

    #[test]
    fn test_empty_ids_rejected() {
        let dir = directory();
        let a = register(&dir, 1);
        assert!(matches!(dir.block(a.account_id, &[]).unwrap_err(), DirectoryError::EmptyIds));
        assert!(matches!(dir.unblock(&[]).unwrap_err(), DirectoryError::EmptyIds));
        assert!(matches!(
            dir.delete(a.account_id, &[]).unwrap_err(),
            DirectoryError::EmptyIds
        ));
    }

    #[test]
    fn test_delete_including_self_flags_forced_logout() {
        let dir = directory();
        let a = register(&dir, 1);
        let b = register(&dir, 2);
        let c = register(&dir, 3);

        let outcome = dir.delete(a.account_id, &[a.account_id, b.account_id]).unwrap();
        assert!(outcome.self_deleted);
        assert_eq!(outcome.affected, 2);

        let remaining = dir.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, c.account_id);
    }

    #[test]
    fn test_delete_last_account_resets_id_space() {
        let dir = directory();
        let a = register(&dir, 1);
        let b = register(&dir, 2);

        let outcome = dir.delete(a.account_id, &[a.account_id, b.account_id]).unwrap();
        assert_eq!(outcome.affected, 2);

        let again = register(&dir, 3);
        assert_eq!(again.account_id, 1);
    }

    #[test]
    fn test_list_orders_by_last_authentication() {
        let dir = directory();
        let a = register(&dir, 1);
        let b = register(&dir, 2);
        let c = register(&dir, 3);

        // b then c authenticate; a never does
        dir.authenticate("user2@example.com", "correct horse battery")
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        dir.authenticate("user3@example.com", "correct horse battery")
            .unwrap();

        let rows = dir.list().unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c.account_id, b.account_id, a.account_id]);
    }

    #[test]
    fn test_bulk_over_missing_ids_is_noop() {
        let dir = directory();
        let a = register(&dir, 1);
        assert_eq!(dir.block(a.account_id, &[998, 999]).unwrap(), 0);
        let outcome = dir.delete(a.account_id, &[998, 999]).unwrap();
        assert_eq!(outcome.affected, 0);
        assert!(!outcome.self_deleted);
    }
}
