//! Admission server
//!
//! Serves admission reviews over TLS on a single route and drains in-flight
//! requests on shutdown. Decisions are delegated to an [`AdmissionHandler`].

mod connection;
mod handler;
mod routes;
#[allow(clippy::module_inception)]
mod server;

pub use handler::{AdmissionHandler, InjectionStrategy, PassThroughHandler};
pub use routes::{admit_body, router};
pub use server::{AdmissionServer, ServerState};
