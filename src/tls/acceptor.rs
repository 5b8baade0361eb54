//! TLS acceptor creation for the admission endpoint

use log::debug;
use openssl::ssl::{SslAcceptor, SslMethod, SslVerifyMode};

use crate::common::Result;
use super::ca::ServerCertificate;

/// Create a TLS acceptor presenting `identity`
///
/// The root is sent as chain certificate so that clients holding the CA
/// bundle can complete the chain. Client certificates are not requested:
/// the API server authenticates the webhook, not the other way around.
pub fn build_acceptor(identity: &ServerCertificate) -> Result<SslAcceptor> {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;

    acceptor.set_private_key(identity.private_key())?;
    acceptor.set_certificate(identity.certificate())?;
    acceptor.add_extra_chain_cert(identity.ca_certificate().to_owned())?;
    acceptor.check_private_key()?;
    acceptor.set_verify(SslVerifyMode::NONE);

    debug!("TLS acceptor ready for {}", identity.dns_name());

    Ok(acceptor.build())
}
