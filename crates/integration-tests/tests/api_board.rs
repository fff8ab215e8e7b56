//! Drives the full router with `oneshot` requests.

use std::sync::Arc;
use std::time::Duration;

use api_adapters::{AppState, AskamaRenderer, BoardMetrics, LocalMedia};
use auth_adapters::SharedSecretGate;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use domains::{AttachmentKey, AttachmentStore};
use secrecy::SecretString;
use services::BoardService;
use storage_adapters::{MemoryAttachmentStore, SqliteBoardRepo, UrlSigner};
use tower::ServiceExt;

const PASSWORD: &str = "hunter2";
const BOUNDARY: &str = "XBOARDBOUNDARY";

struct TestApp {
    router: Router,
    store: Arc<MemoryAttachmentStore>,
}

async fn app() -> TestApp {
    let repo = Arc::new(SqliteBoardRepo::in_memory().await.unwrap());
    let signer = Arc::new(UrlSigner::new("api-test-key", ""));
    let store = Arc::new(MemoryAttachmentStore::new(signer.clone()));
    let board = BoardService::new(
        repo.clone(),
        repo,
        store.clone(),
        Duration::from_secs(600),
    );

    let state = AppState {
        board: Arc::new(board),
        renderer: Arc::new(AskamaRenderer),
        gate: Arc::new(SharedSecretGate::new(&SecretString::from(PASSWORD))),
        metrics: Arc::new(BoardMetrics::new()),
        media: Some(LocalMedia {
            signer,
            store: store.clone(),
        }),
    };

    TestApp {
        router: api_adapters::router(state, 1024 * 1024),
        store,
    }
}

fn auth_header() -> String {
    format!("Basic {}", STANDARD.encode(format!("admin:{PASSWORD}")))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, auth_header())
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, auth_header())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_multipart(uri: &str, content: &str, image: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\n{content}\r\n"
        )
        .as_bytes(),
    );
    if let Some((filename, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::AUTHORIZATION, auth_header())
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

#[tokio::test]
async fn requests_without_credentials_are_refused() {
    let app = app().await;

    let response = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));

    let wrong = format!("Basic {}", STANDARD.encode("admin:nope"));
    let request = Request::get("/")
        .header(header::AUTHORIZATION, wrong)
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_needs_no_credentials() {
    let app = app().await;
    let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app().await;
    let response = send(&app, get("/")).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn create_and_list_threads() {
    let app = app().await;

    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No threads yet"));

    let response = send(&app, post_form("/threads", "title=Hello+world")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/threads/1");

    let html = body_text(send(&app, get("/")).await).await;
    assert!(html.contains("Hello world"));
    assert!(html.contains("/threads/1"));
}

#[tokio::test]
async fn empty_title_is_a_bad_request() {
    let app = app().await;
    let response = send(&app, post_form("/threads", "title=")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, post_form("/threads", "")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_thread_renders_not_found_page() {
    let app = app().await;
    let response = send(&app, get("/threads/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Thread not found"));
}

#[tokio::test]
async fn posting_returns_a_fragment() {
    let app = app().await;
    send(&app, post_form("/threads", "title=t")).await;

    let response = send(&app, post_multipart("/threads/1/posts", "hi <there>", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(!html.contains("<html"));
    assert!(html.contains("hi &lt;there&gt;"));
    assert!(!html.contains("<img"));

    let response = send(
        &app,
        post_multipart("/threads/1/posts", "look", Some(("cat.png", b"meow"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<h4>2</h4>"));
    assert!(html.contains("<img"));
    assert_eq!(app.store.len(), 1);

    let page = body_text(send(&app, get("/threads/1")).await).await;
    assert!(page.contains("look"));
    assert!(page.contains("hi &lt;there&gt;"));
}

#[tokio::test]
async fn posting_to_a_missing_thread_is_not_found() {
    let app = app().await;
    let response = send(
        &app,
        post_multipart("/threads/7/posts", "anyone?", Some(("cat.png", b"meow"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn blank_post_content_is_a_bad_request() {
    let app = app().await;
    send(&app, post_form("/threads", "title=t")).await;
    let response = send(&app, post_multipart("/threads/1/posts", "  ", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn media_route_checks_signatures() {
    let app = app().await;
    send(&app, post_form("/threads", "title=t")).await;
    send(
        &app,
        post_multipart("/threads/1/posts", "pic", Some(("cat.png", b"meow"))),
    )
    .await;

    let key = AttachmentKey::from_stored("1-1-cat.png");
    let url = app
        .store
        .signed_url(&key, Duration::from_secs(60))
        .await
        .unwrap();

    // Signed URLs work without board credentials.
    let response = send(&app, Request::get(url.as_str()).body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_text(response).await, "meow");

    let tampered = format!("{}0", url.trim_end_matches(|c: char| c.is_ascii_hexdigit()));
    let response = send(
        &app,
        Request::get(tampered.as_str()).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn metrics_count_activity() {
    let app = app().await;
    send(&app, post_form("/threads", "title=t")).await;
    send(&app, post_multipart("/threads/1/posts", "one", None)).await;

    let response = send(&app, get("/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("rusty_board_threads_created_total 1"));
    assert!(body.contains("rusty_board_posts_created_total 1"));
    assert!(body.contains("rusty_board_attachments_stored_total 0"));
}
