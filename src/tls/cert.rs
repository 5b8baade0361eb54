//! Certificate inspection helpers
//!
//! Used for startup diagnostics: which root is being served and how to
//! recognise it in the registered CA bundle.

use openssl::hash::MessageDigest;
use openssl::x509::X509Ref;

use crate::common::Result;

/// Render the certificate subject as `KEY=value` pairs, e.g. `CN=webhook.test`
pub fn cert_subject(cert: &X509Ref) -> String {
    cert.subject_name()
        .entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            let value = entry
                .data()
                .as_utf8()
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("{}={}", key, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SHA-256 fingerprint of the DER encoding, as colon-separated upper-case hex
pub fn cert_fingerprint(cert: &X509Ref) -> Result<String> {
    let digest = cert.digest(MessageDigest::sha256())?;
    Ok(digest
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":"))
}
