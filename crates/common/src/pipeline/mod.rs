//! Query Orchestrator
//!
//! Runs one question through embed → search → assemble → complete. This is
//! the only place that calls the components; they never call each other.
//!
//! Every failure is reported as a `QueryError` tagged with its stage, so a
//! caller can tell "retrieval broke" from "the model failed to answer". There
//! is no partial success and no automatic retry.
//!
//! Dropping the future returned by `answer_question` drops the in-flight
//! backend request with it, so a disconnected caller does not leak work.

use crate::completion::{
    create_generator, Answer, CompletionRequest, GenerationParams, Generator,
};
use crate::config::AppConfig;
use crate::context::ContextAssembler;
use crate::embeddings::{create_embedder, Embedder};
use crate::errors::{AppError, QueryError, Result};
use crate::index::{open_index, VectorStore};
use crate::metrics::{self, QueryMetrics};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// System instruction sent with every question
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Answer questions based on the given context.";

/// Default number of passages retrieved per question
pub const DEFAULT_TOP_K: usize = 4;

/// Per-pipeline policy
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub top_k: usize,

    /// Fail with `QueryError::NoContext` when retrieval finds nothing
    pub require_context: bool,

    pub system_instruction: String,
    pub generation: GenerationParams,

    /// Upper bound on the embedding call
    pub embed_timeout: Duration,

    /// Upper bound on the completion call
    pub completion_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            require_context: false,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            generation: GenerationParams::default(),
            embed_timeout: Duration::from_secs(30),
            completion_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&AppConfig> for PipelineOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            require_context: config.retrieval.require_context,
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            generation: GenerationParams::from(&config.generation),
            embed_timeout: config.embedding.timeout(),
            completion_timeout: config.generation.timeout(),
        }
    }
}

/// Outward result shape: `{"answer": ...}` or `{"error": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer { answer: String },
    Error { error: String },
}

impl From<std::result::Result<Answer, QueryError>> for QueryResponse {
    fn from(result: std::result::Result<Answer, QueryError>) -> Self {
        match result {
            Ok(answer) => QueryResponse::Answer {
                answer: answer.into_string(),
            },
            Err(e) => QueryResponse::Error {
                error: e.user_message(),
            },
        }
    }
}

/// End-to-end question answering over injected components
pub struct QueryPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorStore>,
    assembler: ContextAssembler,
    generator: Arc<dyn Generator>,
    options: PipelineOptions,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            assembler: ContextAssembler::new(),
            generator,
            options,
        }
    }

    /// Build every component from configuration.
    ///
    /// Fails fast when the embedding model and the index disagree on dimension.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let index = open_index(&config.index)?;
        let generator = create_generator(&config.generation)?;

        if embedder.dimension() != index.dimension() {
            return Err(AppError::Dimension {
                expected: index.dimension(),
                actual: embedder.dimension(),
            });
        }

        tracing::info!(
            embedding_model = embedder.model_name(),
            generation_model = generator.model_name(),
            documents = index.len(),
            top_k = config.retrieval.top_k,
            "Query pipeline ready"
        );

        Ok(Self::new(embedder, index, generator, PipelineOptions::from(config)))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn index(&self) -> &Arc<dyn VectorStore> {
        &self.index
    }

    /// Answer a question, or say which stage failed
    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer_question(&self, question: &str) -> std::result::Result<Answer, QueryError> {
        let query_metrics = QueryMetrics::start();
        let result = self.run(question).await;

        match &result {
            Ok(answer) => {
                tracing::info!(answer_len = answer.as_str().len(), "Generated answer");
                query_metrics.finish("success");
            }
            Err(e) => query_metrics.finish(&e.stage().to_string()),
        }
        result
    }

    /// Same as `answer_question`, folded into the outward response shape
    pub async fn respond(&self, question: &str) -> QueryResponse {
        self.answer_question(question).await.into()
    }

    async fn run(&self, question: &str) -> std::result::Result<Answer, QueryError> {
        // Whitespace only decides emptiness; backends see the question as asked
        if question.trim().is_empty() {
            return Err(QueryError::Validation("No question provided".to_string()));
        }
        tracing::info!(question = %question, "Received question");

        let embed = self.embedder.embed_one(question);
        let query_vector = bounded("embedding", self.options.embed_timeout, embed)
            .await
            .map_err(QueryError::Retrieval)?;

        let documents = self
            .index
            .search(&query_vector, self.options.top_k)
            .await
            .map_err(QueryError::Retrieval)?;

        tracing::info!(documents = documents.len(), "Found relevant documents");
        metrics::record_retrieval(documents.len());

        if documents.is_empty() {
            if self.options.require_context {
                return Err(QueryError::NoContext);
            }
            tracing::warn!("No documents retrieved, generating without context");
        }

        let context = self.assembler.assemble(&documents);

        let request = CompletionRequest {
            system_instruction: self.options.system_instruction.clone(),
            context,
            question: question.to_string(),
            params: self.options.generation,
        };

        let complete = self.generator.complete(&request);
        let answer = bounded("generation", self.options.completion_timeout, complete)
            .await
            .map_err(QueryError::Generation)?;

        Ok(answer)
    }
}

/// Run a backend call under a deadline
async fn bounded<T>(
    backend: &str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout {
            backend: backend.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
