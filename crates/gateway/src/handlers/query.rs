//! Question answering handler

use crate::AppState;
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use ragline_common::{QueryError, QueryResponse};
use serde::Deserialize;

/// Query request body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Missing or null is treated like an empty question
    #[serde(default)]
    pub question: Option<String>,
}

/// POST /query
pub async fn query(
    State(state): State<AppState>,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, QueryError> {
    let Json(request) = request.map_err(|rejection| {
        QueryError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let question = request.question.unwrap_or_default();

    let answer = state.pipeline.answer_question(&question).await?;

    Ok(Json(QueryResponse::Answer {
        answer: answer.into_string(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::{create_router, AppState};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use ragline_common::{
        completion::{Answer, CompletionRequest, Generator},
        config::AppConfig,
        embeddings::MockEmbedder,
        errors::{AppError, Result},
        index::{Document, MemoryIndex, Metric},
        pipeline::{PipelineOptions, QueryPipeline},
        Embedder,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Answers with the first line of context, or fails with a backend error
    struct FirstPassage {
        fail: bool,
    }

    #[async_trait]
    impl Generator for FirstPassage {
        async fn complete(&self, request: &CompletionRequest) -> Result<Answer> {
            if self.fail {
                return Err(AppError::Backend {
                    backend: "generation".into(),
                    status: Some(500),
                    message: "API error 500: out of memory".into(),
                });
            }
            let first = request.context.as_str().split("\n\n").next().unwrap_or_default();
            Ok(Answer::new(first))
        }

        fn model_name(&self) -> &str {
            "first-passage"
        }
    }

    async fn app(fail: bool) -> axum::Router {
        let embedder = Arc::new(MockEmbedder::new(256));
        let texts = ["Paris is the capital of France.", "Lyon is a city in France."];
        let vectors = embedder
            .embed(&texts.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .await
            .unwrap();

        let mut index = MemoryIndex::new(256, Metric::Cosine);
        for (i, (text, vector)) in texts.iter().zip(vectors).enumerate() {
            index.insert(Document::new(format!("d{i}"), *text), vector).unwrap();
        }

        let pipeline = QueryPipeline::new(
            embedder,
            Arc::new(index),
            Arc::new(FirstPassage { fail }),
            PipelineOptions::default(),
        );

        create_router(AppState {
            config: Arc::new(AppConfig::default()),
            pipeline: Arc::new(pipeline),
            metrics: None,
        })
    }

    fn post_json(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_answer() {
        let response = app(false)
            .await
            .oneshot(post_json(json!({ "question": "What is the capital of France?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({ "answer": "Paris is the capital of France." })
        );
    }

    #[tokio::test]
    async fn test_missing_question_is_bad_request() {
        let response = app(false).await.oneshot(post_json(json!({}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "No question provided");
        assert_eq!(body["stage"], "validation");
    }

    #[tokio::test]
    async fn test_null_question_is_bad_request() {
        let response = app(false)
            .await
            .oneshot(post_json(json!({ "question": null })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "No question provided");
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["stage"], "validation");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(false).await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["stage"], "validation");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_json_error() {
        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .body(Body::from(r#"{"question":"Capital?"}"#))
            .unwrap();
        let response = app(false).await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["stage"], "validation");
    }

    #[tokio::test]
    async fn test_generation_failure_is_bad_gateway() {
        let response = app(true)
            .await
            .oneshot(post_json(json!({ "question": "Capital?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = read_json(response).await;
        assert_eq!(body["stage"], "generation");
        assert_eq!(body["code"], "BACKEND_ERROR");
        assert!(!body["error"].as_str().unwrap().contains("out of memory"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(false)
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_reports_index() {
        let response = app(false)
            .await
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["status"], "ready");
        assert_eq!(body["checks"]["index"]["documents"], 2);
    }
}
