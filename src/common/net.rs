//! Network utility functions

use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use super::error::{WebhookError, Result};

/// Parse a listen address
///
/// Accepts `host:port` as well as the `:port` shorthand, which binds all
/// IPv4 interfaces.
pub fn parse_socket_addr(addr: &str) -> Result<SocketAddr> {
    let addr = addr.trim();
    let normalized = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    if let Ok(socket_addr) = SocketAddr::from_str(&normalized) {
        return Ok(socket_addr);
    }

    match normalized.to_socket_addrs() {
        Ok(mut addrs) => addrs.next().ok_or_else(|| {
            WebhookError::Config(format!("Failed to parse address: {}", addr))
        }),
        Err(e) => Err(WebhookError::Config(format!("Failed to parse address {}: {}", addr, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_socket_addr() {
        let addr = parse_socket_addr("127.0.0.1:8443").unwrap();
        assert_eq!(addr.port(), 8443);

        let addr = parse_socket_addr(":9995").unwrap();
        assert_eq!(addr.port(), 9995);
        assert!(addr.ip().is_unspecified());

        assert!(parse_socket_addr("invalid-address").is_err());
    }
}
