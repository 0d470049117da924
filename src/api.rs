use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    error::{PipelineError, GENERATION_FAILURE_MESSAGE},
};

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct QueryPayload {
    query: String,
}

#[derive(Serialize)]
pub struct QueryResponse {
    response: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/query", post(query_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn query_handler(
    State(state): State<AppState>,
    Json(payload): Json<QueryPayload>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<serde_json::Value>)> {
    let request_id = Uuid::new_v4();
    let span = info_span!("resolve", %request_id);

    let result = async {
        info!("Consulta recibida: {:?}", payload.query);
        state.responder.resolve(&payload.query).await
    }
    .instrument(span)
    .await;

    match result {
        Ok(response) => Ok(Json(QueryResponse { response })),
        Err(PipelineError::EmptyQuery) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": PipelineError::EmptyQuery.to_string()})),
        )),
        Err(e) => {
            error!(%request_id, "Error al resolver la consulta: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": GENERATION_FAILURE_MESSAGE})),
            ))
        }
    }
}

/// Comprueba el repositorio con una búsqueda y expone los backends en uso.
#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let cache = state.responder.cache().backend();
    let repository = state.responder.repository();

    match repository.find_by_issue_type("").await {
        Ok(records) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "cache": cache,
                "repository": repository.backend(),
                "records": records.len(),
                "checked_at": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!("Error en el health check del repositorio: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "cache": cache,
                    "repository": repository.backend(),
                    "error": e.to_string(),
                    "checked_at": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    let sender = state
        .shutdown_sender
        .lock()
        .ok()
        .and_then(|mut guard| guard.take());
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::InMemoryCache,
        classifier::{Classifier, IssueCategory},
        repository::InMemoryRecordRepository,
        responder::{
            tests::{FailingGenerator, RecordingGenerator},
            Responder,
        },
        llm::Generator,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    fn router_with(generator: Arc<dyn Generator>) -> (Router, oneshot::Receiver<()>) {
        let responder = Responder::new(
            Arc::new(InMemoryCache::new()),
            Classifier::new(),
            Arc::new(InMemoryRecordRepository::new()),
            generator,
            Duration::from_secs(3600),
            Duration::from_secs(30),
        );
        let (tx, rx) = oneshot::channel();
        let state = AppState {
            responder: Arc::new(responder),
            shutdown_sender: Arc::new(Mutex::new(Some(tx))),
        };
        (create_router(state), rx)
    }

    async fn post_query(router: Router, query: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/query")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn query_returns_canned_solution() {
        let (router, _rx) = router_with(Arc::new(FailingGenerator));
        let (status, body) = post_query(router, "my pipe is leaking").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], IssueCategory::Plumbing.canned_solution());
    }

    #[tokio::test]
    async fn query_returns_generated_text() {
        let (router, _rx) = router_with(Arc::new(RecordingGenerator::replying("Oil the hinges.")));
        let (status, body) = post_query(router, "strange noise at night").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Oil the hinges.");
    }

    #[tokio::test]
    async fn generation_failure_hides_details() {
        let (router, _rx) = router_with(Arc::new(FailingGenerator));
        let (status, body) = post_query(router, "strange noise at night").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], GENERATION_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let (router, _rx) = router_with(Arc::new(FailingGenerator));
        let (status, _body) = post_query(router, "  ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_reports_backends() {
        let (router, _rx) = router_with(Arc::new(FailingGenerator));
        let request = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["cache"], "memory");
        assert_eq!(body["repository"], "memory");
        assert_eq!(body["records"], 0);
    }

    #[tokio::test]
    async fn shutdown_fires_signal() {
        let (router, rx) = router_with(Arc::new(FailingGenerator));
        let request = Request::builder()
            .method("POST")
            .uri("/api/shutdown")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(rx.await.is_ok());
    }
}
