//! HTTP server for Microtext.
//!
//! Exposes the document store, publish gate and tool surface of a
//! [`Microtext`](mtx_sdk::Microtext) instance as a JSON API. Errors are
//! returned as `{"error": <kind>, "message": <text>}`.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::MicrotextServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use mtx_sdk::Microtext;
    use mtx_store::InMemoryBackend;
    use mtx_tools::{FixedInterpreter, ProposedChange};
    use mtx_types::PageId;
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    const HOME: &str = "---\ncontent:\n  hero:\n    heading: Welcome\n  features:\n  - name: Fast\n  - name: Small\n---\nbody\n";

    fn app() -> Router {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert(PageId::parse("home").unwrap(), HOME);
        let mt = Microtext::in_memory_with(backend).with_interpreter(Arc::new(
            FixedInterpreter::new(vec![
                ProposedChange::new("hero.heading", Some("Welcome"), "Hello"),
                ProposedChange::new("features.0.name", Some("Slow"), "Quick"),
            ]),
        ));
        MicrotextServer::new(ServerConfig::default(), mt).router()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, body) = send(&app(), get("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let (status, body) = send(&app(), get("/v1/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publishing"], true);
        assert_eq!(body["interpreter"], true);
    }

    #[tokio::test]
    async fn pages_and_content() {
        let app = app();
        let (status, pages) = send(&app, get("/v1/pages")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pages[0]["pageId"], "home");
        assert_eq!(pages[0]["fields"], 3);

        let (status, tree) = send(&app, get("/v1/content?page=home")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree["content"]["hero"]["heading"], "Welcome");

        let (_, flat) = send(&app, get("/v1/content?page=home&format=flat")).await;
        assert_eq!(flat["content"]["features.1.name"], "Small");
    }

    #[tokio::test]
    async fn missing_page_is_404() {
        let (status, body) = send(&app(), get("/v1/content?page=nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn write_field_then_publish() {
        let app = app();
        let (status, write) = send(
            &app,
            post(
                "/v1/content/field",
                json!({"pageId": "home", "path": "hero.heading", "value": "Hi"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(write["previousValue"], "Welcome");
        assert_eq!(write["newValue"], "Hi");

        let (_, status) = send(&app, get("/v1/publish/status")).await;
        assert_eq!(status["unpublishedChanges"], 1);

        let request = Request::builder()
            .method("POST")
            .uri("/v1/publish")
            .body(Body::empty())
            .unwrap();
        let (code, outcome) = send(&app, request).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(outcome["published"], true);
        assert_eq!(outcome["filesChanged"], 1);

        let (_, again) = send(&app, post("/v1/publish", json!({"message": "noop"}))).await;
        assert_eq!(again["published"], false);
        assert_eq!(again["filesChanged"], 0);
    }

    #[tokio::test]
    async fn stale_revision_is_409() {
        let app = app();
        let (status, body) = send(
            &app,
            post(
                "/v1/content/field",
                json!({
                    "pageId": "home",
                    "path": "hero.heading",
                    "value": "Hi",
                    "expectedRevision": "00".repeat(32),
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");
    }

    #[tokio::test]
    async fn invalid_path_is_400() {
        let (status, body) = send(
            &app(),
            post(
                "/v1/content/field",
                json!({"pageId": "../etc", "path": "a", "value": "b"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidPath");
    }

    #[tokio::test]
    async fn array_remove_out_of_range() {
        let app = app();
        let (status, body) = send(
            &app,
            post(
                "/v1/content/array",
                json!({"pageId": "home", "arrayPath": "features", "op": "remove", "index": 99}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "IndexOutOfRange");

        let (status, body) = send(
            &app,
            post(
                "/v1/content/array",
                json!({"pageId": "home", "arrayPath": "features", "op": "add"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newLength"], 3);
        assert_eq!(body["item"]["name"], "");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/v1/content/field")
            .header("content-type", "application/json")
            .body(Body::from("{\"pageId\": 1"))
            .unwrap();
        let (status, body) = send(&app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");
    }

    #[tokio::test]
    async fn tools_listing_and_calls() {
        let app = app();
        let (status, tools) = send(&app, get("/v1/tools")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tools.as_array().unwrap().len(), 4);
        assert_eq!(tools[3]["name"], "interpret-instruction");

        let (status, report) = send(
            &app,
            post(
                "/v1/tools/interpret-instruction",
                json!({"pageId": "home", "instruction": "greet"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["changes"][0]["outcome"]["status"], "applied");
        assert_eq!(report["changes"][1]["outcome"]["status"], "stale");
        assert_eq!(report["changes"][1]["outcome"]["actual"], "Fast");

        let (status, body) = send(&app, post("/v1/tools/drop-tables", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "UnknownTool");
    }

    #[tokio::test]
    async fn stale_tool_write_is_409() {
        let (status, body) = send(
            &app(),
            post(
                "/v1/tools/write-field",
                json!({
                    "pageId": "home",
                    "path": "hero.heading",
                    "value": "Hi",
                    "expectedOldValue": "Old"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "StaleValue");
    }
}
