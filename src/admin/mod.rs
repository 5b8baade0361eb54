//! Admin listener
//!
//! Liveness and readiness endpoints on a separate address. The admin server
//! shares only the cancellation token with the admission server.

pub mod handlers;
pub mod server;

pub use server::{build_router, serve_admin, start_admin_server};
