//! reqwest-backed [`Transport`].

use crate::error::{Result, TransportError};
use crate::transport::{Body, HttpRequest, HttpResponse, Method, Transport};
use async_trait::async_trait;
use jktb_core::HttpConfig;
use reqwest::cookie::Jar;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// reqwest-backed transport with one cookie jar for the whole run.
///
/// reqwest fixes the redirect policy per client, so two clients share the jar:
/// one follows redirects, the other hands them back to the caller.
pub struct ReqwestTransport {
    following: Client,
    direct: Client,
    jar: Arc<Jar>,
}

impl ReqwestTransport {
    /// Build both clients from the HTTP settings.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let build = |policy: Policy| {
            Client::builder()
                .cookie_provider(Arc::clone(&jar))
                .danger_accept_invalid_certs(config.accept_invalid_certs)
                .timeout(Duration::from_secs(config.timeout_secs))
                .redirect(policy)
                .build()
                .map_err(|e| TransportError::Build(e.to_string()))
        };

        Ok(Self {
            following: build(Policy::limited(10))?,
            direct: build(Policy::none())?,
            jar,
        })
    }

    /// Cookies currently stored for `url`, as a `Cookie` header value.
    #[must_use]
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        use reqwest::cookie::CookieStore;

        self.jar
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let mut builder = match request.method {
            Method::Get => client.get(url.clone()),
            Method::Post => client.post(url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(fields) => builder.form(fields),
            Body::Json(value) => builder.json(value),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                TransportError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|target| response.url().join(target).ok())
            .map(String::from);
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response per connection and hand back the raw request
    /// heads that were received.
    async fn serve(responses: Vec<&'static str>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.expect("accept");
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = socket.read(&mut chunk).await.expect("read");
                    buf.extend_from_slice(&chunk[..n]);
                    if n == 0 || request_complete(&buf) {
                        break;
                    }
                }
                seen.push(String::from_utf8_lossy(&buf).to_string());
                socket
                    .write_all(response.as_bytes())
                    .await
                    .expect("write");
                socket.shutdown().await.ok();
            }
            seen
        });

        (format!("http://{addr}"), handle)
    }

    fn request_complete(buf: &[u8]) -> bool {
        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        buf.len() >= head_end + 4 + body_len
    }

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(&HttpConfig::default()).expect("build transport")
    }

    #[tokio::test]
    async fn test_redirect_is_returned_when_not_following() {
        let (base, server) = serve(vec![
            "HTTP/1.1 302 Found\r\nLocation: /sfrzwx/auth/login?err=1\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        ])
        .await;

        let response = transport()
            .execute(HttpRequest::post(format!("{base}/login")).form([("a", "b")]).no_redirect())
            .await
            .expect("request succeeds");

        assert_eq!(response.status, 302);
        assert_eq!(
            response.location.as_deref(),
            Some(format!("{base}/sfrzwx/auth/login?err=1").as_str())
        );

        let seen = server.await.expect("server task");
        assert!(seen[0].starts_with("POST /login"));
    }

    #[tokio::test]
    async fn test_cookies_persist_between_requests() {
        let (base, server) = serve(vec![
            "HTTP/1.1 200 OK\r\nSet-Cookie: JSESSIONID=abc123; Path=/\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
        ])
        .await;

        let transport = transport();
        transport
            .execute(HttpRequest::get(format!("{base}/first")))
            .await
            .expect("first request");
        let response = transport
            .execute(HttpRequest::post(format!("{base}/second")).json(json!({"page": 1})))
            .await
            .expect("second request");

        let body: serde_json::Value = response.parse_json().expect("json body");
        assert_eq!(body["ok"], true);

        let seen = server.await.expect("server task");
        assert!(seen[1].contains("JSESSIONID=abc123"));

        let url = Url::parse(&base).expect("base url");
        assert_eq!(transport.cookies_for(&url).as_deref(), Some("JSESSIONID=abc123"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = transport()
            .execute(HttpRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl { .. }));
    }
}
