//! End-to-end tests for the question-answering flow with scripted steps.

use critiq_core::{AppError, AppResult};
use critiq_llm::ChatMessage;
use critiq_pipeline::{
    QaPipeline, ReasoningStep, Relevance, RetrievedDocument, RoleBindings, StepOutput,
};
use serde_json::json;
use std::sync::Arc;

/// Step that replies with fixed assistant text.
struct ScriptedStep {
    reply: String,
}

impl ScriptedStep {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl ReasoningStep for ScriptedStep {
    async fn invoke(&self, conversation: &[ChatMessage]) -> AppResult<StepOutput> {
        let mut messages = conversation.to_vec();
        messages.push(ChatMessage::assistant(self.reply.clone()));
        Ok(StepOutput {
            messages,
            documents: Vec::new(),
        })
    }
}

/// Retrieval step that returns fixed documents plus a tool turn.
struct ScriptedRetrieval {
    documents: Vec<RetrievedDocument>,
}

impl ScriptedRetrieval {
    fn new(documents: Vec<RetrievedDocument>) -> Arc<Self> {
        Arc::new(Self { documents })
    }
}

#[async_trait::async_trait]
impl ReasoningStep for ScriptedRetrieval {
    async fn invoke(&self, conversation: &[ChatMessage]) -> AppResult<StepOutput> {
        let context = self
            .documents
            .iter()
            .map(|d| d.content.clone())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut messages = conversation.to_vec();
        messages.push(ChatMessage::tool(context));
        Ok(StepOutput {
            messages,
            documents: self.documents.clone(),
        })
    }
}

/// Step that always fails, simulating a provider outage.
struct FailingStep;

#[async_trait::async_trait]
impl ReasoningStep for FailingStep {
    async fn invoke(&self, _conversation: &[ChatMessage]) -> AppResult<StepOutput> {
        Err(AppError::Llm("service unavailable".to_string()))
    }
}

fn vector_db_documents() -> Vec<RetrievedDocument> {
    vec![
        RetrievedDocument {
            content: "A vector database stores embeddings for similarity search.".to_string(),
            metadata: json!({"source": "paper.md", "page": 1}),
        },
        RetrievedDocument {
            content: "Paris is the capital of France.".to_string(),
            metadata: json!({"source": "trivia.md"}),
        },
    ]
}

fn bindings(
    retriever: Arc<dyn ReasoningStep>,
    critic: Arc<dyn ReasoningStep>,
    summarizer: Arc<dyn ReasoningStep>,
    verifier: Arc<dyn ReasoningStep>,
) -> RoleBindings {
    RoleBindings {
        retriever,
        critic,
        summarizer,
        verifier,
    }
}

#[tokio::test]
async fn test_flow_filters_irrelevant_chunks() {
    let critic_reply = r#"```json
{
    "chunks": [
        {"chunk_id": 0, "relevance": "HIGHLY_RELEVANT", "rationale": "defines the term", "keep": true},
        {"chunk_id": 1, "relevance": "IRRELEVANT", "rationale": "geography trivia", "keep": false}
    ],
    "summary": "one chunk answers the question",
    "filtered_count": 1
}
```"#;

    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(vector_db_documents()),
        ScriptedStep::new(critic_reply),
        ScriptedStep::new("Draft: a vector database stores embeddings."),
        ScriptedStep::new("A vector database stores embeddings for similarity search."),
    ));

    let report = pipeline.run("What is a vector database?").await.unwrap();

    assert!(report
        .context
        .contains("A vector database stores embeddings for similarity search."));
    assert!(!report.context.contains("Paris"));

    // Verdicts are sorted by relevance: chunk 0 before chunk 1
    assert_eq!(report.chunk_relevance_scores.len(), 2);
    assert_eq!(report.chunk_relevance_scores[0].chunk_id, 0);
    assert_eq!(report.chunk_relevance_scores[1].chunk_id, 1);

    assert_eq!(
        report.answer,
        "A vector database stores embeddings for similarity search."
    );
}

#[tokio::test]
async fn test_flow_survives_malformed_critic_output() {
    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(vector_db_documents()),
        ScriptedStep::new("I think both chunks are fine."),
        ScriptedStep::new("draft"),
        ScriptedStep::new("final"),
    ));

    let report = pipeline.run("What is a vector database?").await.unwrap();

    // Keep-everything fallback: both chunks marked MARGINAL and kept
    assert_eq!(report.chunk_relevance_scores.len(), 2);
    assert!(report
        .chunk_relevance_scores
        .iter()
        .all(|v| v.relevance == Relevance::Marginal && v.keep));

    assert!(report.context.contains("similarity search"));
    assert!(report.context.contains("Paris"));
    assert!(report
        .context_rationale
        .contains("JSON parsing failed - kept all chunks"));
}

#[tokio::test]
async fn test_flow_populates_every_terminal_field() {
    let critic_reply = r#"{"chunks": [{"chunk_id": 0, "relevance": "MARGINAL", "rationale": "ok", "keep": true}], "summary": "fine", "filtered_count": 1}"#;

    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(vec![RetrievedDocument {
            content: "Some evidence.".to_string(),
            metadata: json!({}),
        }]),
        ScriptedStep::new(critic_reply),
        ScriptedStep::new("draft answer"),
        ScriptedStep::new("final answer"),
    ));

    let report = pipeline.run("Anything?").await.unwrap();

    assert!(!report.answer.is_empty());
    assert!(!report.draft_answer.is_empty());
    assert!(!report.context.is_empty());
    assert!(!report.context_rationale.is_empty());
}

#[tokio::test]
async fn test_flow_with_empty_retrieval_degrades_gracefully() {
    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(Vec::new()),
        ScriptedStep::new("never called with anything useful"),
        ScriptedStep::new("I cannot answer based on the available documents."),
        ScriptedStep::new("I cannot answer based on the available documents."),
    ));

    let report = pipeline.run("Unanswerable?").await.unwrap();

    assert_eq!(report.context_rationale, "No chunks retrieved to evaluate");
    assert!(report.chunk_relevance_scores.is_empty());
    assert!(report.answer.contains("cannot answer"));
}

#[tokio::test]
async fn test_critic_failure_does_not_fail_the_run() {
    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(vector_db_documents()),
        Arc::new(FailingStep),
        ScriptedStep::new("draft"),
        ScriptedStep::new("final"),
    ));

    let report = pipeline.run("q").await.unwrap();

    // Pass-through: the unfiltered retrieval context survives
    assert!(report.context.contains("similarity search"));
    assert!(report.context.contains("Paris"));
    assert!(report.context_rationale.contains("Context critic error:"));
    assert_eq!(report.answer, "final");
}

#[tokio::test]
async fn test_summarizer_failure_fails_the_run() {
    let critic_reply = r#"{"chunks": [], "summary": "", "filtered_count": 0}"#;

    let pipeline = QaPipeline::new(bindings(
        ScriptedRetrieval::new(vector_db_documents()),
        ScriptedStep::new(critic_reply),
        Arc::new(FailingStep),
        ScriptedStep::new("never reached"),
    ));

    let result = pipeline.run("q").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_shared_pipeline_is_compiled_once() {
    let make_bindings = || {
        bindings(
            ScriptedRetrieval::new(Vec::new()),
            ScriptedStep::new("a"),
            ScriptedStep::new("b"),
            ScriptedStep::new("c"),
        )
    };

    let first = QaPipeline::shared(make_bindings());
    let second = QaPipeline::shared(make_bindings());

    assert!(Arc::ptr_eq(&first, &second));
}
