//! Low-level connection setup.

use super::config::SmtpConfig;
use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

/// Runs `future` with a deadline.
pub(crate) async fn with_timeout<T, F>(duration: Duration, what: &str, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| Error::Timeout(what.to_string()))?
}

/// Opens the TCP connection to the configured server.
///
/// # Errors
///
/// Returns an error if the connection fails or times out.
pub(crate) async fn connect(config: &SmtpConfig) -> Result<TcpStream> {
    let addr = format!("{}:{}", config.host, config.port);
    tracing::debug!(%addr, security = ?config.security, "connecting");
    with_timeout(config.connect_timeout, "connect", async {
        Ok(TcpStream::connect(&addr).await?)
    })
    .await
}

/// Performs the TLS handshake over an open TCP connection.
///
/// # Errors
///
/// Returns an error if the hostname is invalid or the handshake fails.
pub(crate) async fn upgrade_to_tls(
    tcp_stream: TcpStream,
    hostname: &str,
    timeout: Duration,
) -> Result<TlsStream<TcpStream>> {
    let connector = create_tls_connector();
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;

    with_timeout(timeout, "TLS handshake", async {
        Ok(connector.connect(server_name, tcp_stream).await?)
    })
    .await
}

/// Creates a TLS connector with the bundled root certificates.
fn create_tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_elapses() {
        let result: Result<()> = with_timeout(Duration::from_millis(10), "sleep", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(Error::Timeout(what)) if what == "sleep"));
    }

    #[tokio::test]
    async fn test_timeout_passes_result() {
        let result = with_timeout(Duration::from_secs(1), "ready", async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
