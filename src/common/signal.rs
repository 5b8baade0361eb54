//! Termination signal bridge
//!
//! OS signals are translated into a single cancellation of the controller's
//! [`CancellationToken`]; nothing else in the crate listens for signals.

use log::{error, info};
use tokio_util::sync::CancellationToken;

/// Wait for ctrl-c or SIGTERM, then cancel `token`
///
/// Returns early without cancelling if the token is cancelled by someone else.
pub async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        signal = wait_for_signal() => {
            info!("Received {}, starting graceful shutdown", signal);
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        // Without a signal source only an explicit cancel can stop us.
        std::future::pending::<()>().await;
    }
    "ctrl-c"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_returns_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let waiter = tokio::spawn(shutdown_signal(token.clone()));

        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("signal bridge should stop once the token is cancelled")
            .unwrap();
    }
}
