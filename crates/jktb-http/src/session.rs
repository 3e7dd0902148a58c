//! Cookie-carrying session shared by every stage.

use crate::client::ReqwestTransport;
use crate::error::Result;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use jktb_core::AppConfig;

/// The authenticated state of one run.
///
/// Wraps a transport (which owns the cookies) together with the headers every
/// request carries. Request headers win over base headers of the same name.
pub struct Session {
    transport: Box<dyn Transport>,
    base_headers: Vec<(String, String)>,
}

impl Session {
    /// Wrap `transport`, adding `base_headers` to every request.
    pub fn new(transport: impl Transport + 'static, base_headers: Vec<(String, String)>) -> Self {
        Self {
            transport: Box::new(transport),
            base_headers,
        }
    }

    /// Build a live session from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.http)?;
        Ok(Self::new(transport, config.base_headers()))
    }

    /// Send `request` with the base headers merged in.
    pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let overridden = |name: &str| {
            request
                .headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case(name))
        };
        let mut headers: Vec<(String, String)> = self
            .base_headers
            .iter()
            .filter(|(name, _)| !overridden(name))
            .cloned()
            .collect();
        headers.append(&mut request.headers);
        request.headers = headers;

        let method = match request.method {
            Method::Get => "GET",
            Method::Post => "POST",
        };
        tracing::debug!(method, url = %request.url, redirects = request.follow_redirects, "sending request");

        let response = self.transport.execute(request).await?;
        tracing::debug!(status = response.status, "received response");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse::new(200))
        }
    }

    #[tokio::test]
    async fn test_base_headers_are_merged() {
        let recorder = Recorder::default();
        let session = Session::new(
            recorder.clone(),
            vec![
                ("User-Agent".to_string(), "Mozilla/5.0".to_string()),
                ("Content-Type".to_string(), "text/plain".to_string()),
            ],
        );

        session
            .send(HttpRequest::get("http://example.com").header("content-type", "application/json"))
            .await
            .expect("send");

        let seen = recorder.seen.lock().unwrap();
        let headers = &seen[0].headers;
        assert_eq!(seen[0].header_value("User-Agent"), Some("Mozilla/5.0"));
        assert_eq!(seen[0].header_value("Content-Type"), Some("application/json"));
        assert_eq!(headers.len(), 2);
    }
}
