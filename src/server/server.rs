//! Admission server lifecycle
//!
//! ```text
//! Created --serve--> Listening --shutdown--> ShuttingDown --drained--> Stopped
//!    \_____________________shutdown before serve______________________/
//! ```
//!
//! The current state is published on a `watch` channel. Shutdown is driven
//! by a [`CancellationToken`] that may be shared with the rest of the
//! controller.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use log::{debug, error, info, warn};
use openssl::ssl::SslAcceptor;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::connection::serve_connection;
use super::handler::AdmissionHandler;
use super::routes::router;
use crate::common::{Result, WebhookError};
use crate::tls::{build_acceptor, ServerCertificate};

/// Pause after a failed accept so a persistent error does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Listening => write!(f, "listening"),
            Self::ShuttingDown => write!(f, "shutting down"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// TLS server for admission reviews
pub struct AdmissionServer {
    addr: SocketAddr,
    acceptor: Arc<SslAcceptor>,
    router: Router,
    token: CancellationToken,
    state: watch::Sender<ServerState>,
}

impl AdmissionServer {
    /// Create a server presenting `identity` on `addr`
    pub fn new(
        addr: SocketAddr,
        identity: &ServerCertificate,
        handler: Arc<dyn AdmissionHandler>,
    ) -> Result<Self> {
        let acceptor = build_acceptor(identity)?;
        let (state, _) = watch::channel(ServerState::Created);

        Ok(Self {
            addr,
            acceptor: Arc::new(acceptor),
            router: router(handler),
            token: CancellationToken::new(),
            state,
        })
    }

    /// Stop when `token` is cancelled instead of a private token
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.addr)
            .await
            .map_err(|e| WebhookError::Transport(format!("failed to bind {}: {}", self.addr, e)))
    }

    /// Bind, then serve until shut down
    pub async fn listen_and_serve(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on `listener` until shut down
    ///
    /// Returns `Ok(())` once every connection has drained after shutdown,
    /// or immediately if shutdown happened before serving started.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let mut previous = ServerState::Created;
        let started = self.state.send_if_modified(|state| {
            previous = *state;
            if *state == ServerState::Created {
                *state = ServerState::Listening;
                true
            } else {
                false
            }
        });
        if !started {
            return match previous {
                ServerState::ShuttingDown | ServerState::Stopped => {
                    debug!("Admission server was shut down before serving");
                    Ok(())
                }
                state => Err(WebhookError::Transport(format!(
                    "admission server is already {}",
                    state
                ))),
            };
        }

        match listener.local_addr() {
            Ok(local) => info!("Admission server listening on {}", local),
            Err(_) => info!("Admission server listening on {}", self.addr),
        }

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("Accepted connection from {}", peer);
                        connections.spawn(serve_connection(
                            stream,
                            peer,
                            Arc::clone(&self.acceptor),
                            self.router.clone(),
                            self.token.clone(),
                        ));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },

                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_finished(finished);
                }
            }
        }

        self.state.send_replace(ServerState::ShuttingDown);
        drop(listener);

        info!("Admission server draining {} connection(s)", connections.len());
        while let Some(finished) = connections.join_next().await {
            log_finished(finished);
        }

        self.state.send_replace(ServerState::Stopped);
        info!("Admission server closed");
        Ok(())
    }

    /// Stop accepting, wait for in-flight requests to finish
    ///
    /// Safe to call more than once and from several tasks.
    pub async fn shutdown(&self) -> Result<()> {
        self.token.cancel();

        self.state.send_if_modified(|state| {
            if *state == ServerState::Created {
                *state = ServerState::Stopped;
                true
            } else {
                false
            }
        });

        let mut state = self.state.subscribe();
        if state.wait_for(|state| *state == ServerState::Stopped).await.is_err() {
            return Err(WebhookError::Transport("server state channel closed".to_string()));
        }
        Ok(())
    }

    /// Like [`AdmissionServer::shutdown`], giving up after `timeout`
    pub async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, self.shutdown())
            .await
            .map_err(|_| {
                WebhookError::Transport(format!(
                    "connections still open after {:?} of draining",
                    timeout
                ))
            })?
    }
}

fn log_finished(finished: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("{}", e),
        Err(e) => warn!("Connection task failed: {}", e),
    }
}

impl fmt::Debug for AdmissionServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionServer")
            .field("addr", &self.addr)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{InjectionStrategy, PassThroughHandler};
    use crate::tls::RootCa;

    fn server() -> AdmissionServer {
        let ca = RootCa::generate("Test Root").unwrap();
        let identity = ca.issue_leaf("webhook.test").unwrap();
        AdmissionServer::new(
            "127.0.0.1:0".parse().unwrap(),
            &identity,
            Arc::new(PassThroughHandler::new(InjectionStrategy::Cni)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_before_serve() {
        let server = server();
        assert_eq!(server.state(), ServerState::Created);

        server.shutdown().await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);

        let listener = server.bind().await.unwrap();
        server.serve(listener).await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_shutdown_stops_serve_loop() {
        let server = Arc::new(server());
        let mut states = server.subscribe();
        let listener = server.bind().await.unwrap();

        let serving = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(listener).await }
        });
        states.wait_for(|state| *state == ServerState::Listening).await.unwrap();

        server.shutdown().await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(serving.await.unwrap().is_ok());

        // second call is a no-op
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_serve_twice_is_rejected() {
        let server = Arc::new(server());
        let mut states = server.subscribe();
        let first = server.bind().await.unwrap();
        let second = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let serving = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(first).await }
        });
        states.wait_for(|state| *state == ServerState::Listening).await.unwrap();

        assert!(matches!(server.serve(second).await, Err(WebhookError::Transport(_))));

        server.shutdown_with_timeout(Duration::from_secs(5)).await.unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shared_token_stops_server() {
        let token = CancellationToken::new();
        let server = server().with_shutdown_token(token.clone());

        token.cancel();
        server.listen_and_serve().await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
    }
}
