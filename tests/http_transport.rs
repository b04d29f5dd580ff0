//! HTTP transport tests against a `wiremock` server.
//!
//! Streamed bodies use `set_body_raw(bytes, "text/event-stream")`.

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamchat::chat::{BufferRenderer, SendOutcome, StreamChat};
use streamchat::session_id::is_valid_session_id;
use streamchat::{
    ChatRequest, HttpTransport, InputBox, MarkdownRenderer, MemoryStorage, RenderStyle, Theme,
    Transport,
};

fn make_transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(&format!("{}/generate", server.uri())).expect("valid url")
}

fn plain() -> MarkdownRenderer {
    MarkdownRenderer::new(RenderStyle::Plain, Theme::Dark)
}

#[tokio::test]
async fn posts_prompt_and_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({"prompt": "Hi there"})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            b"data: Hello[NEWLINE]world\n\ndata: [DONE]\n\n".to_vec(),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let chat = StreamChat::new(make_transport(&server), MemoryStorage::new(), plain());
    let mut input = InputBox::new();
    input.set_value("Hi there");
    let mut renderer = BufferRenderer::new();

    let outcome = chat.send(&mut input, &mut renderer).await;
    assert!(outcome.is_completed(), "{outcome:?}");
    assert_eq!(
        renderer.last_response(),
        Some(plain().render("Hello\nworld").as_str())
    );

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let session_id = body["sessionId"].as_str().expect("sessionId field");
    assert!(is_valid_session_id(session_id));
    assert_eq!(session_id, chat.session_id());
    assert_eq!(body["prompt"], "Hi there");
}

#[tokio::test]
async fn non_success_status_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal failure"))
        .mount(&server)
        .await;

    let transport = make_transport(&server);
    let err = match transport.post(&ChatRequest::new("hi", "abc")).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert!(err.is_api());
    assert_eq!(err.status_code(), Some(500));
    assert_eq!(err.to_string(), "API request failed: 500");
}

#[tokio::test]
async fn failed_request_is_shown_in_reply_region() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let chat = StreamChat::new(make_transport(&server), MemoryStorage::new(), plain());
    let mut input = InputBox::new();
    input.set_value("anyone there?");
    let mut renderer = BufferRenderer::new();

    let outcome = chat.send(&mut input, &mut renderer).await;
    assert!(matches!(outcome, SendOutcome::Failed(_)));
    assert_eq!(renderer.last_response(), Some("error: API request failed: 404"));
    assert!(input.is_enabled());
}

/// URL on a local port nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/generate")
}

#[tokio::test]
async fn unreachable_server_is_connection_error() {
    let transport = HttpTransport::new(&closed_port_url()).expect("valid url");
    let err = match transport.post(&ChatRequest::new("hi", "abc")).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    assert!(err.is_connection(), "{err:?}");
}

#[tokio::test]
async fn refused_connection_is_reported_once() {
    let transport = HttpTransport::new(&closed_port_url()).expect("valid url");
    let chat = StreamChat::new(transport, MemoryStorage::new(), plain());
    let mut input = InputBox::new();
    input.set_value("hello?");
    let mut renderer = BufferRenderer::new();

    let outcome = chat.send(&mut input, &mut renderer).await;
    assert!(matches!(outcome, SendOutcome::Failed(ref err) if err.is_connection()));
    let shown = renderer.last_response().expect("error shown");
    assert!(
        shown.starts_with("error: Connection error: error sending request"),
        "{shown}"
    );
    assert_eq!(shown.matches("Connection error").count(), 1, "{shown}");
}

#[test]
fn rejects_bad_urls() {
    assert!(HttpTransport::new("not a url").is_err());
    assert!(HttpTransport::new("file:///tmp/socket").is_err());
    let transport = HttpTransport::new("http://localhost:8080/generate").expect("valid url");
    assert_eq!(transport.api_url().path(), "/generate");
}
