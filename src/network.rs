use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::Config;
use crate::prober::Probe;

/// HTTP client used for link-health probes
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpClient {
    /// Create a client with settings tuned for many short probes against unrelated hosts.
    /// The per-probe deadline is passed to [`HttpClient::is_healthy`], not fixed here.
    pub fn new(user_agent: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(&user_agent)
            .connect_timeout(Duration::from_secs(Config::CONNECT_TIMEOUT_SECS))
            // Few repeat visits per host, keep the idle pool small
            .pool_max_idle_per_host(Config::POOL_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(Config::POOL_IDLE_TIMEOUT_SECS))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(Config::MAX_REDIRECTS))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, user_agent }
    }

    /// Get the user agent string used by this client
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Two-stage reachability check: HEAD, then a one-byte ranged GET.
    ///
    /// Anything other than a status below 400 on one of the two stages is
    /// unhealthy, including timeouts, DNS and TLS failures.
    pub async fn is_healthy(&self, url: &str, deadline: Duration) -> bool {
        match self.head(url, deadline).await {
            Ok(status) if is_success(status) => return true,
            Ok(status) => {
                tracing::debug!(url, status = status.as_u16(), "HEAD rejected, trying ranged GET");
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "HEAD failed, trying ranged GET");
            }
        }

        match self.ranged_get(url, deadline).await {
            Ok(status) => {
                tracing::debug!(url, status = status.as_u16(), "ranged GET answered");
                is_success(status)
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "ranged GET failed");
                false
            }
        }
    }

    async fn head(&self, url: &str, deadline: Duration) -> Result<StatusCode, FetchError> {
        let request = self.client.head(url).timeout(deadline).send();
        let response = timeout(deadline, request)
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(Self::classify_error)?;
        Ok(response.status())
    }

    /// GET restricted to the first byte. The body is dropped unread.
    async fn ranged_get(&self, url: &str, deadline: Duration) -> Result<StatusCode, FetchError> {
        let request = self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(deadline)
            .send();
        let response = timeout(deadline, request)
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(Self::classify_error)?;
        Ok(response.status())
    }

    /// Classify reqwest errors so debug logs say why a link was judged dead
    fn classify_error(error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout;
        }
        if error.is_builder() {
            return FetchError::InvalidUrl(error.to_string());
        }

        let error_msg = format!("{:?}", error).to_lowercase();

        if error_msg.contains("connection refused") {
            return FetchError::ConnectionRefused;
        }

        if error_msg.contains("dns") || error_msg.contains("resolve") {
            return FetchError::DnsError;
        }

        if error_msg.contains("ssl") || error_msg.contains("tls") || error_msg.contains("certificate") {
            return FetchError::SslError;
        }

        FetchError::NetworkError(error.to_string())
    }
}

#[async_trait]
impl Probe for HttpClient {
    async fn probe(&self, url: &str, deadline: Duration) -> bool {
        self.is_healthy(url, deadline).await
    }
}

fn is_success(status: StatusCode) -> bool {
    status.as_u16() < 400
}

/// Why a probe stage failed to produce a status. Never escapes the prober.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Connection refused - server not accepting connections")]
    ConnectionRefused,

    #[error("DNS resolution failed")]
    DnsError,

    #[error("SSL/TLS error - certificate or encryption issue")]
    SslError,

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use parking_lot::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// What the throwaway server saw: (method, had Range: bytes=0-0).
    type Seen = Arc<Mutex<Vec<(String, bool)>>>;

    /// Serve canned status codes per method. `None` means accept and never answer.
    async fn spawn_server(head: Option<u16>, get: Option<u16>) -> (SocketAddr, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let seen_srv = Arc::clone(&seen);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let seen = Arc::clone(&seen_srv);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let text = String::from_utf8_lossy(&buf).to_lowercase();
                    let method = text.split_whitespace().next().unwrap_or("").to_uppercase();
                    let ranged = text.contains("range: bytes=0-0");
                    seen.lock().push((method.clone(), ranged));

                    let status = if method == "HEAD" { head } else { get };
                    let Some(code) = status else {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    };
                    let (len, body) = if method == "HEAD" { (0, "") } else { (1, "x") };
                    let response = format!(
                        "HTTP/1.1 {} Status\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        code, len, body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (addr, seen)
    }

    fn client() -> HttpClient {
        HttpClient::new("TestBot/1.0".to_string())
    }

    #[tokio::test]
    async fn test_head_ok_is_healthy() {
        let (addr, seen) = spawn_server(Some(200), Some(500)).await;
        let url = format!("http://{}/", addr);
        assert!(client().is_healthy(&url, Duration::from_secs(5)).await);
        // No fallback when HEAD succeeds
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_head_rejected_falls_back_to_ranged_get() {
        let (addr, seen) = spawn_server(Some(405), Some(206)).await;
        let url = format!("http://{}/page", addr);
        assert!(client().is_healthy(&url, Duration::from_secs(5)).await);

        let seen = seen.lock().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("HEAD".to_string(), false));
        assert_eq!(seen[1], ("GET".to_string(), true));
    }

    #[tokio::test]
    async fn test_not_found_on_both_stages_is_dead() {
        let (addr, _) = spawn_server(Some(404), Some(404)).await;
        let url = format!("http://{}/missing", addr);
        assert!(!client().is_healthy(&url, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_redirect_status_counts_as_healthy() {
        // 304 has no Location, so the client hands the status straight back
        let (addr, _) = spawn_server(Some(304), Some(404)).await;
        let url = format!("http://{}/", addr);
        assert!(client().is_healthy(&url, Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn test_timeout_on_both_stages_is_dead() {
        let (addr, seen) = spawn_server(None, None).await;
        let url = format!("http://{}/slow", addr);
        let started = std::time::Instant::now();
        assert!(!client().is_healthy(&url, Duration::from_millis(200)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_dead() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{}/", addr);
        assert!(!client().is_healthy(&url, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_invalid_url_is_dead() {
        assert!(!client().is_healthy("not-a-url", Duration::from_secs(1)).await);
        assert!(!client().is_healthy("", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_http_client_creation() {
        let client = HttpClient::new("TestBot/1.0".to_string());
        assert_eq!(client.user_agent(), "TestBot/1.0");
    }
}
