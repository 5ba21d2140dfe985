pub mod api;

use self::api::AppState;
use std::error::Error;
use std::net::SocketAddr;
use log::{ info, warn, error };

/// PEM certificate and key for serving HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

impl TlsPaths {
    /// Checks the TLS flags the way they arrive from the command line.
    pub fn from_args(
        enable_tls: bool,
        cert_path: Option<&str>,
        key_path: Option<&str>
    ) -> Result<Option<Self>, Box<dyn Error + Send + Sync>> {
        if !enable_tls {
            return Ok(None);
        }
        match (cert_path, key_path) {
            (Some(cert), Some(key)) =>
                Ok(Some(TlsPaths { cert_path: cert.to_string(), key_path: key.to_string() })),
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                Err("Missing TLS certificate or key path".into())
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                Err("TLS enabled without cert/key".into())
            }
        }
    }
}

pub struct Server {
    addr: String,
    state: AppState,
    tls: Option<TlsPaths>,
}

impl Server {
    pub fn new(addr: String, state: AppState, tls: Option<TlsPaths>) -> Self {
        if state.api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Endpoints are open.");
        }
        Self { addr, state, tls }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = api::router(self.state);

        match self.tls {
            Some(tls) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    tls.cert_path,
                    tls.key_path
                );
                let config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    &tls.cert_path,
                    &tls.key_path
                ).await?;
                info!("HTTPS server listening on: https://{}", addr);
                axum_server::bind_rustls(addr, config).serve(app.into_make_service()).await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                    error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                    e
                })?;
                info!("HTTP server listening on: http://{}", addr);
                axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
            }
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        futures::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
