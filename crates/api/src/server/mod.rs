//! HTTP(S) server, routing and shared middleware.
//!
//! The router merges the per-integration routers that [`state::AppState`]
//! carries, then adds `/health`, `/apidocs` and the JSON 404 fallback.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
pub mod tls;
