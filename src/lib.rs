//! Filechest Server
//!
//! A self-hosted file chest: uploads go in over multipart HTTP, get stored
//! under collision-resistant names, and come back out with byte-range
//! support for media playback and resumable downloads.
//!
//! # Modules
//!
//! - `naming`: stored-name generation
//! - `storage`: flat-directory blob store with atomic publish
//! - `db`: SQLite upload ledger
//! - `policy`: IP ban list
//! - `ingest`: the write-path orchestrator
//! - `routes`: HTTP surface

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod naming;
pub mod policy;
pub mod routes;
pub mod state;
pub mod storage;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/health", routes::health::router())
        .nest("/upload", routes::upload::router())
        .nest("/uploads", routes::files::router())
        .nest("/public", routes::public::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
