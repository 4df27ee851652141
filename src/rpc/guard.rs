//! Session guard: authenticates the bearer token on privileged routes.
//!
//! Token verification is stateless, so a token can outlive its account.
//! The guard closes that gap by re-resolving the account through the
//! store's current-token lookup before any privileged operation runs:
//! a deleted account, a superseded token, or a blocked account all fail
//! `Forbidden` here.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

use crate::account::{AccountId, CredentialStore};
use crate::error::DirectoryError;
use crate::token::TokenIssuer;

use super::types::ApiError;
use super::RpcState;

/// Identity resolved from a valid session, attached to the request for
/// handlers to use as the requester.
#[derive(Clone, Debug)]
pub struct AuthedAccount {
    pub id: AccountId,
    pub email: String,
}

pub struct SessionGuard {
    issuer: TokenIssuer,
    store: Arc<CredentialStore>,
}

impl SessionGuard {
    pub fn new(issuer: TokenIssuer, store: Arc<CredentialStore>) -> Self {
        Self { issuer, store }
    }

    /// Verify the token cryptographically, then re-check current account
    /// state. Every failure collapses to `Forbidden` for the caller.
    pub fn authenticate_request(&self, token: &str) -> Result<AuthedAccount, DirectoryError> {
        let claims = self.issuer.verify(token).map_err(|err| {
            debug!(%err, "token verification failed");
            DirectoryError::Forbidden
        })?;

        let account = self
            .store
            .find_by_token(token)
            .map_err(|_| DirectoryError::Forbidden)?;

        if account.id != claims.account_id || account.is_blocked() {
            return Err(DirectoryError::Forbidden);
        }

        Ok(AuthedAccount {
            id: account.id,
            email: account.email,
        })
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Middleware layered on the privileged sub-router.
pub async fn require_session(
    State(state): State<RpcState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or(DirectoryError::Forbidden)?
        .to_string();
    let authed = state.guard.authenticate_request(&token)?;
    req.extensions_mut().insert(authed);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStatus, NewAccount};
    use crate::token::DEFAULT_TTL_MS;
    use axum::http::HeaderValue;

    fn setup() -> (Arc<CredentialStore>, SessionGuard) {
        let store = Arc::new(CredentialStore::in_memory());
        let issuer = TokenIssuer::new(b"test-secret-test-secret-32-bytes".to_vec(), DEFAULT_TTL_MS);
        let guard = SessionGuard::new(issuer, store.clone());
        (store, guard)
    }

    fn seed(store: &CredentialStore, guard: &SessionGuard) -> (AccountId, String) {
        let account = store
            .create(NewAccount {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                created_at: 0,
            })
            .unwrap();
        let token = guard
            .issuer
            .issue(account.id, &account.email, None)
            .unwrap();
        store.set_session_token(account.id, &token).unwrap();
        (account.id, token)
    }

    #[test]
    fn test_valid_session_resolves_identity() {
        let (store, guard) = setup();
        let (id, token) = seed(&store, &guard);

        let authed = guard.authenticate_request(&token).unwrap();
        assert_eq!(authed.id, id);
        assert_eq!(authed.email, "alice@example.com");
    }

    #[test]
    fn test_superseded_token_forbidden() {
        let (store, guard) = setup();
        let (id, old_token) = seed(&store, &guard);

        // Re-login: a fresh token replaces the stored one
        let new_token = guard.issuer.issue(id, "alice@example.com", None).unwrap();
        store.set_session_token(id, &new_token).unwrap();

        assert!(matches!(
            guard.authenticate_request(&old_token).unwrap_err(),
            DirectoryError::Forbidden
        ));
        assert!(guard.authenticate_request(&new_token).is_ok());
    }

    #[test]
    fn test_blocked_account_forbidden() {
        let (store, guard) = setup();
        let (id, token) = seed(&store, &guard);

        store.update_status(&[id], AccountStatus::Blocked).unwrap();
        assert!(matches!(
            guard.authenticate_request(&token).unwrap_err(),
            DirectoryError::Forbidden
        ));
    }

    #[test]
    fn test_deleted_account_forbidden() {
        let (store, guard) = setup();
        let (id, token) = seed(&store, &guard);

        store.delete(&[id]).unwrap();
        assert!(matches!(
            guard.authenticate_request(&token).unwrap_err(),
            DirectoryError::Forbidden
        ));
    }

    #[test]
    fn test_garbage_token_forbidden() {
        let (_store, guard) = setup();
        assert!(matches!(
            guard.authenticate_request("not-a-token").unwrap_err(),
            DirectoryError::Forbidden
        ));
    }

    #[test]
    fn test_bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_none());
    }
}
