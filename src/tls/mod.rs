//! TLS module
//!
//! Certificate authority generation, leaf issuance and the TLS acceptor used
//! by the admission server.

pub mod ca;
mod acceptor;
mod cert;

pub use acceptor::build_acceptor;
pub use ca::{CaOptions, RootCa, ServerCertificate, Validity};
pub use cert::{cert_fingerprint, cert_subject};
