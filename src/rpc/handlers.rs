//! Route handlers: thin shells mapping HTTP bodies onto directory
//! operations. All state-machine logic lives in the core.

use axum::extract::State;
use axum::{Extension, Json};
use tracing::debug;

use super::guard::AuthedAccount;
use super::types::*;
use super::RpcState;

pub async fn register(
    State(state): State<RpcState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    debug!(email = %req.email, "register request");
    let reg = state
        .directory
        .register(&req.username, &req.email, &req.password)?;
    Ok(Json(RegisterResponse {
        account_id: reg.account_id,
        token: reg.token,
    }))
}

pub async fn login(
    State(state): State<RpcState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!(email = %req.email, "login request");
    let auth = state.directory.authenticate(&req.email, &req.password)?;
    Ok(Json(LoginResponse {
        account_id: auth.account_id,
        token: auth.token,
        status: auth.status,
    }))
}

pub async fn list_accounts(
    State(state): State<RpcState>,
    Extension(authed): Extension<AuthedAccount>,
) -> Result<Json<Vec<AccountRow>>, ApiError> {
    debug!(requester_id = authed.id, "list accounts");
    let accounts = state.directory.list()?;
    Ok(Json(accounts.iter().map(AccountRow::from).collect()))
}

pub async fn block_accounts(
    State(state): State<RpcState>,
    Extension(authed): Extension<AuthedAccount>,
    Json(req): Json<BulkIdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let affected_count = state.directory.block(authed.id, &req.ids)?;
    Ok(Json(BulkResponse { affected_count }))
}

pub async fn unblock_accounts(
    State(state): State<RpcState>,
    Extension(_authed): Extension<AuthedAccount>,
    Json(req): Json<BulkIdsRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let affected_count = state.directory.unblock(&req.ids)?;
    Ok(Json(BulkResponse { affected_count }))
}

pub async fn delete_accounts(
    State(state): State<RpcState>,
    Extension(authed): Extension<AuthedAccount>,
    Json(req): Json<BulkIdsRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let outcome = state.directory.delete(authed.id, &req.ids)?;
    Ok(Json(DeleteResponse {
        affected_count: outcome.affected,
        self_deleted: outcome.self_deleted,
    }))
}
