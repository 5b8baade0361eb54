//! Single admission connection: TLS handshake, then HTTP/1.1

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use log::debug;
use openssl::ssl::{Ssl, SslAcceptor};
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::common::{Result, WebhookError};

/// Serve one client until it disconnects or `token` is cancelled
///
/// On cancellation the connection stops reading new requests, finishes the
/// one in flight and then closes.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: Arc<SslAcceptor>,
    router: Router,
    token: CancellationToken,
) -> Result<()> {
    let ssl = Ssl::new(acceptor.context())?;
    let mut tls = SslStream::new(ssl, stream)?;

    tokio::select! {
        handshake = Pin::new(&mut tls).accept() => {
            handshake.map_err(|e| {
                WebhookError::Transport(format!("TLS handshake with {} failed: {}", peer, e))
            })?;
        }
        _ = token.cancelled() => return Ok(()),
    }
    debug!("TLS handshake with {} complete", peer);

    let service = service_fn(move |req: Request<Incoming>| {
        router.clone().oneshot(req.map(Body::new))
    });
    let conn = http1::Builder::new().serve_connection(TokioIo::new(tls), service);
    tokio::pin!(conn);

    let finished = tokio::select! {
        result = conn.as_mut() => Some(result),
        _ = token.cancelled() => None,
    };
    let result = match finished {
        Some(result) => result,
        None => {
            debug!("Draining connection from {}", peer);
            conn.as_mut().graceful_shutdown();
            conn.as_mut().await
        }
    };

    result.map_err(|e| WebhookError::Transport(format!("connection from {}: {}", peer, e)))
}
