//! HTTP surface: axum router, shared state, and the session guard.

pub mod guard;
pub mod handlers;
pub mod types;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::directory::AccountDirectory;
use guard::SessionGuard;

#[derive(Clone)]
pub struct RpcState {
    pub directory: Arc<AccountDirectory>,
    pub guard: Arc<SessionGuard>,
}

pub struct RpcServer {
    state: RpcState,
    bind_addr: String,
}

impl RpcServer {
    pub fn new(
        directory: Arc<AccountDirectory>,
        guard: Arc<SessionGuard>,
        bind_addr: String,
    ) -> Self {
        Self {
            state: RpcState { directory, guard },
            bind_addr,
        }
    }

    /// The full route table. Every bulk operation and the listing sit
    /// behind the session guard; register and login are open.
    pub fn router(state: RpcState) -> Router {
        let privileged = Router::new()
            .route("/users", get(handlers::list_accounts))
            .route("/users/block", post(handlers::block_accounts))
            .route("/users/unblock", post(handlers::unblock_accounts))
            .route("/users/delete", post(handlers::delete_accounts))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                guard::require_session,
            ));

        Router::new()
            .route("/register", post(handlers::register))
            .route("/login", post(handlers::login))
            .merge(privileged)
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app = Self::router(self.state);
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "server listening");
        axum::serve(listener, app).await
    }
}
