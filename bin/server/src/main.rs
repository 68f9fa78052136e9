//! Soapbox Board Server
//!
//! HTTP server for a discussion board: posts with per-user vote ledgers,
//! arbitrarily nested comments, and token-gated writes. State lives in
//! memory and is mirrored to RocksDB when a data directory is configured.
//!
//! ## Usage
//!
//! ```bash
//! # Run in memory on the default address (127.0.0.1:8087)
//! soapbox-server
//!
//! # Bind elsewhere and persist across restarts
//! SOAPBOX_ADDR=0.0.0.0:8087 SOAPBOX_DATA_DIR=/var/lib/soapbox soapbox-server
//!
//! # Enable debug logging
//! RUST_LOG=debug soapbox-server
//! ```

mod auth;
mod config;
mod handlers;
mod persistence;
mod rate_limit;
mod state;
#[cfg(test)]
mod tests;

use auth::TokenStore;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use config::ServerConfig;
use rate_limit::RateLimitLayer;
use state::{AppState, PersistentBoard};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Assembles the full application router.
///
/// Reads and writes sit behind separate rate-limit budgets; the session
/// endpoints count as writes even though they need no bearer token.
fn build_app(app_state: AppState, trust_proxy_headers: bool) -> Router {
    let read_router = Router::new()
        .route("/posts", get(handlers::list_posts))
        .route("/posts/search", get(handlers::list_posts))
        .route("/post/{id}", get(handlers::get_post))
        .route("/comments/{post_id}", get(handlers::get_comments))
        .route("/health", get(handlers::health))
        .layer(RateLimitLayer::for_reads(trust_proxy_headers));

    let write_router = Router::new()
        .route("/create", post(handlers::create_post))
        .route("/update/{id}", put(handlers::update_post))
        .route("/delete/{id}", delete(handlers::delete_post))
        .route("/post/vote/{id}", post(handlers::vote_post))
        .route("/comment/new", post(handlers::create_comment))
        .route("/comment/update/{id}", put(handlers::update_comment))
        .route("/comment/delete/{id}", delete(handlers::delete_comment))
        .route("/comment/vote/{id}", post(handlers::vote_comment))
        .route("/session/new", post(handlers::open_session))
        .route("/session/refresh", post(handlers::refresh_session))
        .layer(RateLimitLayer::for_writes(trust_proxy_headers));

    Router::new()
        .merge(read_router)
        .merge(write_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soapbox=info,soapbox_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let board = match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "opening persistent board");
            Arc::new(PersistentBoard::open(dir)?)
        }
        None => {
            info!("no data directory configured, board state will not survive restarts");
            Arc::new(PersistentBoard::in_memory())
        }
    };
    info!(
        posts = board.post_count(),
        comments = board.comment_count(),
        "board ready"
    );

    let tokens = Arc::new(TokenStore::new(config.access_ttl));
    let app_state = AppState { board, tokens };
    let app = build_app(app_state, config.trust_proxy_headers);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Soapbox server running on http://{}", config.bind_addr);
    info!("");
    info!("Session Endpoints:");
    info!("  POST   /session/new          - Open a session, returns token pair");
    info!("  POST   /session/refresh      - Exchange refresh token for new pair");
    info!("");
    info!("Post Endpoints:");
    info!("  POST   /create               - Create a post");
    info!("  GET    /posts                - List posts (paginated, filterable)");
    info!("  GET    /posts/search         - Same as /posts");
    info!("  GET    /post/:id             - Get one post");
    info!("  PUT    /update/:id           - Update a post (author only)");
    info!("  DELETE /delete/:id           - Delete a post and its comments");
    info!("  POST   /post/vote/:id        - Vote on a post");
    info!("");
    info!("Comment Endpoints:");
    info!("  GET    /comments/:postId     - Nested comment tree of a post");
    info!("  POST   /comment/new          - Create a comment or reply");
    info!("  PUT    /comment/update/:id   - Edit a comment (author only)");
    info!("  DELETE /comment/delete/:id   - Delete a comment and its replies");
    info!("  POST   /comment/vote/:id     - Vote on a comment");
    info!("");
    info!("  GET    /health               - Health check");

    // Connect info is what rate limiting keys on for direct connections.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
