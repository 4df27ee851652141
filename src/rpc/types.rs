//! Request/response shapes for the HTTP surface.
//!
//! Bodies use camelCase field names throughout.
//! Credentials never appear in any response shape.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::account::{Account, AccountId, AccountStatus};
use crate::error::DirectoryError;

// Missing keys deserialize to empty strings so the directory can report
// MissingField instead of the body failing to parse.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub account_id: AccountId,
    pub token: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub account_id: AccountId,
    pub token: String,
    pub status: AccountStatus,
}

/// One row of the account listing.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccountRow {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    /// RFC 3339, or null for accounts that never authenticated.
    pub last_login: Option<String>,
    pub status: AccountStatus,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        let last_login = account
            .last_authenticated_at
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .map(|dt| dt.to_rfc3339());
        AccountRow {
            id: account.id,
            name: account.username.clone(),
            email: account.email.clone(),
            last_login,
            status: account.status,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct BulkIdsRequest {
    pub ids: Vec<AccountId>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    pub affected_count: usize,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub affected_count: usize,
    pub self_deleted: bool,
}

#[derive(Serialize, Debug)]
struct ErrorBody {
    message: String,
}

/// HTTP-facing wrapper mapping the directory taxonomy onto statuses.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let status = match err {
            DirectoryError::MissingField(_) | DirectoryError::EmptyIds => StatusCode::BAD_REQUEST,
            DirectoryError::DuplicateEmail | DirectoryError::SelfBlock => StatusCode::CONFLICT,
            DirectoryError::BadCredential => StatusCode::UNAUTHORIZED,
            DirectoryError::Blocked | DirectoryError::Forbidden => StatusCode::FORBIDDEN,
            DirectoryError::NotRegistered => StatusCode::NOT_FOUND,
            DirectoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        // Never leak storage detail to the caller
        let message = match &err {
            DirectoryError::Unavailable(_) => "service unavailable".to_string(),
            other => other.to_string(),
        };
        ApiError { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { message: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::current_unix_timestamp_ms;

    #[test]
    fn test_account_row_hides_credentials() {
        let account = Account {
            id: 3,
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            status: AccountStatus::Active,
            last_authenticated_at: Some(current_unix_timestamp_ms()),
            session_token: Some("tok".to_string()),
            created_at: 0,
        };
        let row = AccountRow::from(&account);
        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("tok"));
        assert!(json.contains("\"lastLogin\""));
        assert!(json.contains("\"status\":\"active\""));
    }

    #[test]
    fn test_missing_body_fields_default_empty() {
        let req: RegisterRequest = serde_json::from_str("{}").unwrap();
        assert!(req.username.is_empty());
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }
}
