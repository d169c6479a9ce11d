//! TLS server configuration from PEM material

use crate::{Result, WebhookError};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use std::sync::Arc;

/// Build a rustls server configuration from a PEM private key and certificate chain.
///
/// Advertises `h2` and `http/1.1` over ALPN.
pub fn server_config(key_pem: &str, cert_pem: &str) -> Result<Arc<ServerConfig>> {
    let certs = parse_certs(cert_pem)?;
    let key = parse_private_key(key_pem)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| WebhookError::Tls(e.to_string()))?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| WebhookError::Tls(format!("Invalid certificate or key: {}", e)))?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

fn parse_certs(pem: &str) -> Result<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut pem.as_bytes())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WebhookError::Tls(format!("Failed to parse certificate: {}", e)))?;

    if certs.is_empty() {
        return Err(WebhookError::Tls("No certificate found in PEM".to_string()));
    }

    Ok(certs)
}

fn parse_private_key(pem: &str) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut pem.as_bytes())
        .map_err(|e| WebhookError::Tls(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| WebhookError::Tls("No private key found in PEM".to_string()))
}
