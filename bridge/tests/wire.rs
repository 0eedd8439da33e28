//! Request/response fidelity against a worker that echoes what it received.

use std::time::Duration;

use serde_json::{Value, json};
use stylebridge_bridge::{BridgeClient, BridgeError};
use stylebridge_types::{AnalysisOutcome, AnalysisRequest, Diagnostic, ParseFailure};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Reports one diagnostic whose text is the request's `filePath` and whose
/// line is the length of `fileContent` (0 when absent).
struct Echo;

impl Respond for Echo {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = request.body_json().unwrap();
        let line = body["fileContent"].as_str().map_or(0, str::len);
        ResponseTemplate::new(200).set_body_json(json!([{
            "line": line,
            "rule": "echo",
            "text": body["filePath"],
            "severity": "warning"
        }]))
    }
}

async fn echo_worker() -> (MockServer, BridgeClient) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(Echo)
        .mount(&server)
        .await;
    let client =
        BridgeClient::new("127.0.0.1", server.address().port(), Duration::from_secs(5)).unwrap();
    (server, client)
}

#[tokio::test]
async fn file_path_is_transmitted_verbatim() {
    let (_server, client) = echo_worker().await;

    let request = AnalysisRequest::new("/a/b.css", "/w/stylelintconfig.json");
    let outcome = client.analyze(&request).await.unwrap();

    assert_eq!(
        outcome,
        AnalysisOutcome::Diagnostics(vec![Diagnostic::new(0, "echo", "/a/b.css")])
    );
}

#[tokio::test]
async fn non_ascii_path_and_content_survive() {
    let (_server, client) = echo_worker().await;

    let request = AnalysisRequest::new("/projets/thème/écran.css", "/w/c.json")
        .with_content("a { color: \"é\" }");
    let outcome = client.analyze(&request).await.unwrap();

    let AnalysisOutcome::Diagnostics(diagnostics) = outcome else {
        panic!("expected diagnostics");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message(), "/projets/thème/écran.css");
    assert_eq!(diagnostics[0].line(), "a { color: \"é\" }".len() as u32);
}

#[tokio::test]
async fn syntax_error_wins_over_rule_diagnostics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"line": 1, "rule": "block-no-empty", "text": "Unexpected empty block (block-no-empty)"},
            {"line": 4, "rule": "CssSyntaxError", "text": "Unclosed block (CssSyntaxError)"},
            {"line": 9, "rule": "CssSyntaxError", "text": "Unknown word (CssSyntaxError)"}
        ])))
        .mount(&server)
        .await;
    let client =
        BridgeClient::new("127.0.0.1", server.address().port(), Duration::from_secs(5)).unwrap();

    let outcome = client
        .analyze(&AnalysisRequest::new("/a/b.css", "/c.json"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AnalysisOutcome::ParseFailure(ParseFailure::new(4, "Unclosed block"))
    );
}

#[tokio::test]
async fn entry_missing_a_field_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"line": 1, "rule": "x"}])),
        )
        .mount(&server)
        .await;
    let client =
        BridgeClient::new("127.0.0.1", server.address().port(), Duration::from_secs(5)).unwrap();

    let err = client
        .analyze(&AnalysisRequest::new("/a/b.css", "/c.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Protocol { .. }), "{err}");
}

#[tokio::test]
async fn slow_worker_hits_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/analyze"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let client =
        BridgeClient::new("127.0.0.1", server.address().port(), Duration::from_millis(300))
            .unwrap();

    let err = client
        .analyze(&AnalysisRequest::new("/a/b.css", "/c.json"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, BridgeError::Transport { endpoint: "analyze", .. }),
        "{err}"
    );
}
