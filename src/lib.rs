//! Proxy injector admission controller
//!
//! A self-bootstrapping mutating admission webhook for the service-mesh
//! control plane. On start it:
//!
//! 1. generates a fresh root CA ([`tls::RootCa`]),
//! 2. registers a `MutatingWebhookConfiguration` trusting that CA
//!    ([`registrar::WebhookRegistrar`]),
//! 3. serves admission reviews over TLS with a leaf issued by the CA
//!    ([`server::AdmissionServer`]) until asked to shut down.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use proxy_injector::config::Settings;
//! use proxy_injector::controller::Controller;
//! use proxy_injector::registrar::{InMemoryWebhookStore, WebhookRegistrar, WebhookSpec};
//! use proxy_injector::server::PassThroughHandler;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> proxy_injector::Result<()> {
//!     let settings = Settings::default();
//!     let registrar = WebhookRegistrar::new(
//!         Arc::new(InMemoryWebhookStore::new()),
//!         WebhookSpec::from_settings(&settings),
//!     );
//!     let handler = Arc::new(PassThroughHandler::new(settings.injection_strategy()));
//!
//!     let shutdown = CancellationToken::new();
//!     tokio::spawn(proxy_injector::common::shutdown_signal(shutdown.clone()));
//!
//!     Controller::new(settings, registrar, handler).run(shutdown).await
//! }
//! ```

pub mod admin;
pub mod common;
pub mod config;
pub mod controller;
pub mod registrar;
pub mod server;
pub mod tls;

pub use common::{parse_socket_addr, Result, WebhookError};
pub use controller::Controller;
pub use server::{AdmissionHandler, AdmissionServer};
pub use tls::RootCa;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
