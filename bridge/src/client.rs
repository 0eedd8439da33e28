//! HTTP client for a worker listening on a loopback port.

use std::time::Duration;

use reqwest::StatusCode;
use stylebridge_types::text::truncate_payload;
use stylebridge_types::{AnalysisOutcome, AnalysisRequest};

use crate::error::BridgeError;
use crate::protocol::{self, STATUS_OK, WireIssue, WireRequest};

/// Longest payload excerpt kept in protocol errors.
const MAX_PAYLOAD_CHARS: usize = 2_000;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Request/response calls against one worker.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base: String,
    port: u16,
}

impl BridgeClient {
    /// Build a client for `http://{host}:{port}/` with `timeout` applied to
    /// every request.
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(BridgeError::HttpClient)?;
        Ok(Self {
            http,
            base: format!("http://{host}:{port}"),
            port,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base)
    }

    /// Health check. Never fails: anything but an exact `OK!` body is "not alive".
    pub async fn is_alive(&self) -> bool {
        let response = match self.http.get(self.endpoint("status")).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(port = self.port, "Error requesting server status: {e}");
                return false;
            }
        };
        match response.text().await {
            Ok(body) if body == STATUS_OK => true,
            Ok(body) => {
                tracing::debug!(
                    port = self.port,
                    "Unexpected status body: {}",
                    truncate_payload(&body, 80)
                );
                false
            }
            Err(e) => {
                tracing::debug!(port = self.port, "Error reading server status: {e}");
                false
            }
        }
    }

    /// Analyze one file.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, BridgeError> {
        let response = self
            .http
            .post(self.endpoint("analyze"))
            .json(&WireRequest::from(request))
            .send()
            .await
            .map_err(|source| BridgeError::Transport {
                endpoint: "analyze",
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| BridgeError::Transport {
                endpoint: "analyze",
                source,
            })?;

        if status != StatusCode::OK {
            return Err(BridgeError::UnexpectedStatus {
                status: status.as_u16(),
                file: request.file_path().to_path_buf(),
                payload: truncate_payload(&body, MAX_PAYLOAD_CHARS),
            });
        }

        let issues: Vec<WireIssue> =
            serde_json::from_str(&body).map_err(|source| BridgeError::Protocol {
                file: request.file_path().to_path_buf(),
                payload: truncate_payload(&body, MAX_PAYLOAD_CHARS),
                source,
            })?;

        tracing::trace!(
            file = %request.file_path().display(),
            count = issues.len(),
            "Worker response decoded"
        );
        Ok(protocol::into_outcome(issues))
    }

    /// Ask the worker to shut itself down. Best effort.
    pub async fn close(&self) -> bool {
        match self.http.post(self.endpoint("close")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(port = self.port, "Error requesting server shutdown: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use stylebridge_types::{Diagnostic, ParseFailure};

    use super::*;

    fn client_for(server: &MockServer) -> BridgeClient {
        BridgeClient::new("127.0.0.1", server.address().port(), Duration::from_secs(5)).unwrap()
    }

    // ── /status ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn alive_when_status_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK!"))
            .mount(&server)
            .await;

        assert!(client_for(&server).is_alive().await);
    }

    #[tokio::test]
    async fn not_alive_on_other_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Booting"))
            .mount(&server)
            .await;

        assert!(!client_for(&server).is_alive().await);
    }

    #[tokio::test]
    async fn not_alive_when_nothing_listens() {
        let port = crate::net::find_open_port().unwrap();
        let client = BridgeClient::new("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        assert!(!client.is_alive().await);
    }

    // ── /analyze ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn analyze_sends_wire_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(serde_json::json!({
                "filePath": "/a/b.css",
                "fileContent": null,
                "configFile": "/w/stylelintconfig.json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/w/stylelintconfig.json");
        let outcome = client_for(&server).analyze(&request).await.unwrap();
        assert_eq!(outcome, AnalysisOutcome::Diagnostics(Vec::new()));
    }

    #[tokio::test]
    async fn analyze_decodes_issues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"line":1,"rule":"block-no-empty","text":"Unexpected empty block (block-no-empty)"}]"#,
            ))
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let outcome = client_for(&server).analyze(&request).await.unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::Diagnostics(vec![Diagnostic::new(
                1,
                "block-no-empty",
                "Unexpected empty block (block-no-empty)"
            )])
        );
    }

    #[tokio::test]
    async fn analyze_reports_syntax_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"line":2,"rule":"CssSyntaxError","text":"Missed semicolon (CssSyntaxError)"}]"#,
            ))
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let outcome = client_for(&server).analyze(&request).await.unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::ParseFailure(ParseFailure::new(2, "Missed semicolon"))
        );
    }

    #[tokio::test]
    async fn malformed_body_is_protocol_error_with_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Invalid response"))
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let err = client_for(&server).analyze(&request).await.unwrap_err();
        assert!(err.is_protocol_error());
        match err {
            BridgeError::Protocol { payload, file, .. } => {
                assert_eq!(payload, "Invalid response");
                assert_eq!(file, std::path::PathBuf::from("/a/b.css"));
            }
            other => panic!("expected Protocol, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_payload_is_truncated() {
        let server = MockServer::start().await;
        let garbage = "x".repeat(MAX_PAYLOAD_CHARS * 3);
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string(garbage))
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let err = client_for(&server).analyze(&request).await.unwrap_err();
        let BridgeError::Protocol { payload, .. } = err else {
            panic!("expected Protocol");
        };
        assert!(payload.chars().count() < MAX_PAYLOAD_CHARS + 40);
        assert!(payload.ends_with("more characters)"));
    }

    #[tokio::test]
    async fn server_error_is_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let err = client_for(&server).analyze(&request).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn analyze_without_worker_is_transport_error() {
        let port = crate::net::find_open_port().unwrap();
        let client = BridgeClient::new("127.0.0.1", port, Duration::from_secs(1)).unwrap();
        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        let err = client.analyze(&request).await.unwrap_err();
        assert!(matches!(err, BridgeError::Transport { endpoint: "analyze", .. }));
    }

    // ── /close ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn close_posts_to_worker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/close"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).close().await);
    }
}
