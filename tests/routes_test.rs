use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use econews_agent::chat::{ChatError, ChatMessage};
use econews_agent::config::AgentConfig;
use econews_agent::dataset::UTF8_BOM;
use econews_agent::llm::{CompletionClient, DeltaStream, StreamDelta};
use econews_agent::server::{AppState, create_router};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Answers every request with the same deltas.
#[derive(Default)]
struct FixedClient {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CompletionClient for FixedClient {
    async fn stream(&self, _model: &str, _messages: &[ChatMessage]) -> Result<DeltaStream, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items = ["He", "llo"].map(|d| Ok::<_, ChatError>(StreamDelta::new(d)));
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

fn setup() -> (Arc<FixedClient>, Arc<AppState>) {
    let client = Arc::new(FixedClient::default());
    let state = AppState::with_client(client.clone(), &AgentConfig::default()).unwrap();
    (client, state)
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
    create_router(state.clone()).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[tokio::test]
async fn test_models_lists_fixed_choices() {
    let (_, state) = setup();
    let response = send(&state, Request::get("/api/models").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json["models"],
        serde_json::json!(["llama3.1:8b-instruct-q4_K_M", "llama3.2:3b"])
    );
    assert_eq!(json["default"], "llama3.1:8b-instruct-q4_K_M");
}

#[tokio::test]
async fn test_chat_streams_and_records_reply() {
    let (client, state) = setup();
    let request = Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"model":"llama3.2:3b","message":"hi"}"#))
        .unwrap();

    let response = send(&state, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;

    assert!(body.contains("event: partial"));
    assert!(body.contains(r#""text":"He""#));
    assert!(body.contains("event: done"));
    assert!(body.contains(r#""outcome":"completed""#));
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);

    let response = send(&state, Request::get("/api/messages").body(Body::empty()).unwrap()).await;
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json[0]["role"], "user");
    assert_eq!(json[1]["role"], "assistant");
    assert_eq!(json[1]["content"], "Hello");
}

#[tokio::test]
async fn test_unknown_model_is_rejected() {
    let (client, state) = setup();
    let request = Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"model":"gpt-4o","message":"hi"}"#))
        .unwrap();

    let response = send(&state, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analyze_without_article_column_is_unprocessable() {
    let (client, state) = setup();
    let request = Request::post("/api/analyze?model=llama3.2:3b")
        .body(Body::from("title,body\nFed,Rates\n"))
        .unwrap();

    let response = send(&state, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("article"));
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    assert!(state.session.lock().await.is_empty());
}

#[tokio::test]
async fn test_analyze_streams_prompts_per_chunk() {
    let (client, state) = setup();
    let request = Request::post("/api/analyze")
        .body(Body::from("title,article\na,A\nb,\nc,B\n"))
        .unwrap();

    let response = send(&state, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;

    let table_at = body.find("event: table").unwrap();
    assert!(table_at < body.find("event: prompt").unwrap());
    assert!(body.contains(r#""headers":["title","article"]"#));
    assert_eq!(body.matches("event: prompt").count(), 2);
    assert!(body.contains("A\\n\\nno content"));
    assert!(body.contains("event: analysis_done"));
    assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    assert_eq!(state.session.lock().await.len(), 4);
}

#[tokio::test]
async fn test_analyze_without_csv_or_harvest() {
    let (_, state) = setup();
    let response = send(&state, Request::post("/api/analyze").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_csv_download() {
    let (_, state) = setup();
    let response = send(&state, Request::get("/api/harvest/csv").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let mut csv = UTF8_BOM.to_vec();
    csv.extend_from_slice(b"title,article\nFed,Rates\n");
    *state.latest_csv.write().await = Some(csv.clone());

    let response = send(&state, Request::get("/api/harvest/csv").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("moneydj_news.csv")
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), csv.as_slice());
}

#[tokio::test]
async fn test_stop_sets_cancel_flag() {
    let (_, state) = setup();
    let response = send(&state, Request::post("/api/stop").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.cancel.is_requested());
}
