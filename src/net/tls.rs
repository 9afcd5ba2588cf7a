//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Load TLS configuration from certificate and key files.
///
/// The PEM contents are validated up front with rustls-pemfile so a broken
/// certificate surfaces as a clear startup error, not a handshake failure.
pub async fn load_tls_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<RustlsConfig, std::io::Error> {
    let cert_bytes = std::fs::read(cert_path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("certificate file {:?}: {}", cert_path, e),
        )
    })?;
    let certs: Vec<_> =
        rustls_pemfile::certs(&mut cert_bytes.as_slice()).collect::<Result<_, _>>()?;
    if certs.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("no certificates found in {:?}", cert_path),
        ));
    }

    let key_bytes = std::fs::read(key_path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("private key file {:?}: {}", key_path, e))
    })?;
    if rustls_pemfile::private_key(&mut key_bytes.as_slice())?.is_none() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("no private key found in {:?}", key_path),
        ));
    }

    RustlsConfig::from_pem_file(cert_path, key_path).await
}
