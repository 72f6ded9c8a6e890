//! Web server module
//!
//! Provides the HTTP API for txn-query.

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
