//! TLS termination for the single registry listener

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use error_common::{RegistryError, Result};
use http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::TcpListener;
use tokio_rustls::rustls::crypto::ring;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tower::{Service, ServiceExt};

fn config_error(message: impl std::fmt::Display) -> RegistryError {
    RegistryError::ConfigError(format!("TLS: {message}"))
}

/// Server TLS configuration offering HTTP/2 and HTTP/1.1 over ALPN
///
/// # Errors
/// Fails when the PEM material holds no certificate or no private key, or
/// when the key does not match the certificate.
pub fn server_config(cert_pem: &str, key_pem: &str) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(config_error)?;
    if certs.is_empty() {
        return Err(config_error("no certificate found in PEM"));
    }
    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(config_error)?
        .ok_or_else(|| config_error("no private key found in PEM"))?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(config_error)?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(config_error)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Accept TLS connections until `shutdown` resolves, serving each with
/// HTTP/1.1 or HTTP/2 as the client negotiates.
///
/// Connections already accepted keep running after `shutdown`.
pub async fn serve<S, F>(listener: TcpListener, acceptor: TlsAcceptor, service: S, shutdown: F)
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    continue;
                }
            },
            () = &mut shutdown => {
                tracing::info!("Listener stopped");
                return;
            }
        };

        let acceptor = acceptor.clone();
        let service = service.clone();
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "TLS handshake failed");
                    return;
                }
            };

            let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
                service.clone().oneshot(request.map(Body::new))
            });

            let builder = auto::Builder::new(TokioExecutor::new());
            if let Err(e) = builder
                .serve_connection_with_upgrades(TokioIo::new(stream), hyper_service)
                .await
            {
                tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}
