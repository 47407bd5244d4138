//! TLS termination for the listener.

use std::io;
use std::path::Path;
use axum_server::tls_rustls::RustlsConfig;

/// Load a rustls config from PEM certificate chain and private key files.
///
/// Missing files are reported by path before rustls gets to parse anything.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, io::Error> {
    for (kind, path) in [("certificate", cert_path), ("private key", key_path)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {} file not found: {}", kind, path.display()),
            ));
        }
    }

    let config = RustlsConfig::from_pem_file(cert_path, key_path).await?;
    tracing::info!(cert = %cert_path.display(), "TLS configuration loaded");
    Ok(config)
}
