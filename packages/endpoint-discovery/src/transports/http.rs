//! reqwest-backed transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result, TransportError, TransportResult};
use crate::traits::transport::{Transport, TransportRequest, TransportResponse};
use crate::types::candidate::Method;

const DEFAULT_USER_AGENT: &str = concat!("endpoint-discovery/", env!("CARGO_PKG_VERSION"));

/// HTTP transport using a shared `reqwest::Client`.
///
/// Redirects are followed, so a redirect to a login page surfaces as the
/// HTML page it lands on rather than as a bare 3xx.
///
/// # Example
///
/// ```rust,ignore
/// use endpoint_discovery::transports::HttpTransport;
///
/// let transport = HttpTransport::new()?.with_user_agent("my-prober/1.0");
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| DiscoveryError::Client(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Use a preconfigured client (proxies, TLS settings).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn build_headers(&self, request: &TransportRequest<'_>) -> TransportResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| TransportError::InvalidRequest(format!("user agent: {}", e)))?;
        headers.insert(USER_AGENT, user_agent);

        for (name, value) in request.headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header {}: {}", name, e)))?;
            let mut value = HeaderValue::from_str(value.expose())
                .map_err(|_| TransportError::InvalidRequest(format!("header {}: invalid value", name)))?;
            value.set_sensitive(true);
            headers.insert(name, value);
        }

        Ok(headers)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Http(error.to_string())
    }
}

/// Read at most `limit` body bytes. The rest of the stream is never pulled.
async fn read_limited(
    mut response: reqwest::Response,
    limit: usize,
) -> TransportResult<(String, bool)> {
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    let mut truncated = false;

    while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
        let room = limit - buf.len();
        if chunk.len() > room {
            buf.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    Ok((decode_body(buf), truncated))
}

/// Lossy UTF-8, dropping a multi-byte char split by the cut.
fn decode_body(mut bytes: Vec<u8>) -> String {
    match std::str::from_utf8(&bytes) {
        Ok(_) => {}
        Err(e) if e.error_len().is_none() => bytes.truncate(e.valid_up_to()),
        Err(_) => return String::from_utf8_lossy(&bytes).into_owned(),
    }
    String::from_utf8(bytes).unwrap_or_default()
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest<'_>) -> TransportResult<TransportResponse> {
        let headers = self.build_headers(&request)?;

        debug!(method = %request.method, url = %request.url, "HTTP request starting");
        let response = self
            .client
            .request(to_reqwest_method(request.method), request.url)
            .headers(headers)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %request.url, error = %e, "HTTP request failed");
                classify_error(e)
            })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();

        let (body, truncated) = read_limited(response, request.max_body_bytes).await?;
        if truncated {
            debug!(url = %request.url, limit = request.max_body_bytes, "Response body cut at limit");
        }

        Ok(TransportResponse {
            status,
            headers,
            body,
            truncated,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::AuthHeaders;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one raw HTTP/1.1 response on a loopback port.
    async fn serve_once(body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(head.as_bytes()).await;
            // The client hangs up after its limit, so later writes may fail
            let _ = socket.write_all(body.as_bytes()).await;
        });
        format!("http://{}/api/exports", addr)
    }

    #[test]
    fn test_build_headers_marks_values_sensitive() {
        let transport = HttpTransport::new().unwrap();
        let auth = AuthHeaders::new()
            .with_bearer_token("secret-token")
            .with_header("X-Organization-Id", "1964");
        let request = TransportRequest {
            method: Method::Get,
            url: "https://api.example.com/api/projects",
            headers: &auth,
            timeout: Duration::from_secs(1),
            max_body_bytes: 1024,
        };

        let headers = transport.build_headers(&request).unwrap();
        let authorization = headers.get("authorization").unwrap();
        assert!(authorization.is_sensitive());
        assert_eq!(authorization.to_str().unwrap(), "Bearer secret-token");
        assert!(headers.get(USER_AGENT).is_some());
    }

    #[test]
    fn test_build_headers_rejects_invalid_name() {
        let transport = HttpTransport::new().unwrap();
        let auth = AuthHeaders::new().with_header("bad header", "x");
        let request = TransportRequest {
            method: Method::Get,
            url: "https://api.example.com/",
            headers: &auth,
            timeout: Duration::from_secs(1),
            max_body_bytes: 1024,
        };

        assert!(matches!(
            transport.build_headers(&request),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_error() {
        let transport = HttpTransport::new().unwrap();
        let auth = AuthHeaders::new();
        let request = TransportRequest {
            method: Method::Get,
            // Port 9 (discard) is not expected to be listening
            url: "http://127.0.0.1:9/api",
            headers: &auth,
            timeout: Duration::from_secs(2),
            max_body_bytes: 1024,
        };

        assert!(transport.send(request).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_body_is_cut_at_limit() {
        let body = format!("[{}]", vec![r#"{"id":1}"#; 50_000].join(","));
        let url = serve_once(body.clone()).await;
        let transport = HttpTransport::new().unwrap();
        let auth = AuthHeaders::new();
        let request = TransportRequest {
            method: Method::Get,
            url: &url,
            headers: &auth,
            timeout: Duration::from_secs(5),
            max_body_bytes: 1024,
        };

        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(response.truncated);
        assert_eq!(response.body.len(), 1024);
        assert!(body.starts_with(&response.body));
    }

    #[tokio::test]
    async fn test_body_under_limit_is_whole() {
        let url = serve_once(r#"[{"id":7}]"#.to_string()).await;
        let transport = HttpTransport::new().unwrap();
        let auth = AuthHeaders::new();
        let request = TransportRequest {
            method: Method::Get,
            url: &url,
            headers: &auth,
            timeout: Duration::from_secs(5),
            max_body_bytes: 1024,
        };

        let response = transport.send(request).await.unwrap();

        assert!(!response.truncated);
        assert_eq!(response.body, r#"[{"id":7}]"#);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_decode_drops_split_char() {
        let mut bytes = "né".as_bytes().to_vec();
        bytes.pop();
        assert_eq!(decode_body(bytes), "n");
        assert_eq!(decode_body(vec![b'a', 0xff, b'b']), "a\u{fffd}b");
    }
}
