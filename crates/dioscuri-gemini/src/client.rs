//! Gemini client
//!
//! One TLS connection per request: connect, send the URL, read the
//! response until the server closes.

use std::sync::Arc;
use std::time::Duration;

use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::ServerName;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;

use crate::response::read_response;
use crate::tofu::{KnownHosts, TofuVerifier};
use crate::{GeminiError, GeminiUrl, Response, Result};

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Budget for the TLS handshake plus the whole response
    pub read_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct Client {
    known_hosts: KnownHosts,
    options: ClientOptions,
    provider: Arc<CryptoProvider>,
}

impl Client {
    pub fn new(known_hosts: KnownHosts, options: ClientOptions) -> Self {
        Self {
            known_hosts,
            options,
            provider: Arc::new(ring::default_provider()),
        }
    }

    pub fn known_hosts(&self) -> &KnownHosts {
        &self.known_hosts
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Fetch `url`. Redirects are returned to the caller, not followed.
    pub async fn fetch(&self, url: &GeminiUrl) -> Result<Response> {
        let request = url.request_line()?;
        let host = url.host();
        let port = url.port();

        let verifier = Arc::new(TofuVerifier::new(
            self.known_hosts.clone(),
            url.host_key(),
            Arc::clone(&self.provider),
        ));
        let config = rustls::ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(verifier.clone())
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| GeminiError::InvalidUrl(format!("{host}: {e}")))?;

        tracing::debug!(%url, "Connecting");
        let tcp = timeout(self.options.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| GeminiError::Timeout("connecting"))??;

        let exchange = async {
            let mut stream = connector.connect(server_name, tcp).await.map_err(|err| {
                match verifier.take_rejection() {
                    Some(reason) => GeminiError::Untrusted(reason),
                    None => GeminiError::Io(err),
                }
            })?;

            stream.write_all(request.as_bytes()).await?;
            stream.flush().await?;

            read_response(stream, self.options.max_body_bytes).await
        };

        timeout(self.options.read_timeout, exchange)
            .await
            .map_err(|_| GeminiError::Timeout("waiting for response"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dioscuri_storage::Database;

    fn client() -> Client {
        let known_hosts = KnownHosts::new(Database::open_in_memory().unwrap());
        Client::new(
            known_hosts,
            ClientOptions {
                connect_timeout: Duration::from_secs(2),
                read_timeout: Duration::from_secs(2),
                max_body_bytes: 1024,
            },
        )
    }

    #[tokio::test]
    async fn test_overlong_request_is_refused_before_connecting() {
        let url = GeminiUrl::parse(&format!("gemini://127.0.0.1:1/{}", "a".repeat(1100))).unwrap();
        assert!(matches!(
            client().fetch(&url).await,
            Err(GeminiError::RequestTooLong(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let url = GeminiUrl::parse("gemini://127.0.0.1:1/").unwrap();
        let result = client().fetch(&url).await;
        assert!(matches!(
            result,
            Err(GeminiError::Io(_)) | Err(GeminiError::Timeout(_))
        ));
    }
}
