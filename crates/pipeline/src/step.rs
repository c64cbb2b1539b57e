//! Reasoning-step seam between the pipeline and its collaborators.
//!
//! A reasoning step is a role-bound capability the controller can invoke
//! with a conversation and get a transcript back. LLM-backed steps add an
//! assistant reply; tool-backed steps may also return structured documents.
//! Bindings are explicit values injected into the pipeline constructor, not
//! module-level globals.

use critiq_core::{AppError, AppResult};
use critiq_llm::{last_content, ChatMessage, ChatRequest, ChatRole, LlmClient};
use critiq_prompt::AgentRole;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A document returned by retrieval tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Document text
    pub content: String,

    /// Backend metadata; `source` and `page` keys are surfaced on extracted
    /// chunks when present
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Result of one reasoning-step invocation.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// Full transcript: the input turns plus everything the step appended
    pub messages: Vec<ChatMessage>,

    /// Structured documents, non-empty when the step used retrieval tooling
    pub documents: Vec<RetrievedDocument>,
}

/// A role-bound reasoning capability the pipeline controller can invoke.
#[async_trait::async_trait]
pub trait ReasoningStep: Send + Sync {
    async fn invoke(&self, conversation: &[ChatMessage]) -> AppResult<StepOutput>;
}

/// Vector-search backend consumed by the retrieval step.
#[async_trait::async_trait]
pub trait DocumentRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedDocument>>;
}

/// LLM-backed reasoning step with a fixed role instruction.
pub struct LlmStep {
    client: Arc<dyn LlmClient>,
    role: AgentRole,
    model: String,
    temperature: Option<f32>,
}

impl LlmStep {
    /// Bind a role to an LLM client and model.
    pub fn new(client: Arc<dyn LlmClient>, role: AgentRole, model: impl Into<String>) -> Self {
        Self {
            client,
            role,
            model: model.into(),
            temperature: None,
        }
    }

    /// Set the sampling temperature for this role.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait::async_trait]
impl ReasoningStep for LlmStep {
    async fn invoke(&self, conversation: &[ChatMessage]) -> AppResult<StepOutput> {
        tracing::debug!("Invoking {} step (model: {})", self.role.name(), self.model);

        let mut request = ChatRequest::new(conversation.to_vec(), &self.model)
            .with_system(self.role.instruction());

        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = self.client.chat(&request).await?;

        let mut messages = conversation.to_vec();
        messages.push(response.message);

        Ok(StepOutput {
            messages,
            documents: Vec::new(),
        })
    }
}

/// Tool-backed retrieval step.
///
/// Searches the document store with the latest user turn and appends the
/// consolidated context as a tool turn, alongside the structured documents
/// for downstream chunk extraction.
pub struct RetrieverStep {
    retriever: Arc<dyn DocumentRetriever>,
}

impl RetrieverStep {
    pub fn new(retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait::async_trait]
impl ReasoningStep for RetrieverStep {
    async fn invoke(&self, conversation: &[ChatMessage]) -> AppResult<StepOutput> {
        let query = last_content(conversation, ChatRole::User)
            .ok_or_else(|| AppError::Pipeline("Retrieval step needs a user turn".to_string()))?;

        let documents = self.retriever.retrieve(query).await?;
        tracing::info!("Retrieval tooling returned {} documents", documents.len());

        let context = render_context(&documents);

        let mut messages = conversation.to_vec();
        messages.push(ChatMessage::tool(context));

        Ok(StepOutput {
            messages,
            documents,
        })
    }
}

/// Render retrieved documents into a single consolidated context string.
fn render_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let mut header = format!("[{}]", i);
            if let Some(source) = doc.metadata.get("source").and_then(|v| v.as_str()) {
                header.push(' ');
                header.push_str(source);
            }
            format!("{}\n{}", header, doc.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use critiq_llm::{ChatResponse, LlmUsage};
    use serde_json::json;
    use std::sync::Mutex;

    /// LLM stub that records the request and replies with fixed text.
    struct RecordingClient {
        reply: String,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl RecordingClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmClient for RecordingClient {
        fn provider_name(&self) -> &str {
            "stub"
        }

        async fn chat(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(ChatResponse {
                message: ChatMessage::assistant(self.reply.clone()),
                model: request.model.clone(),
                usage: LlmUsage::default(),
            })
        }
    }

    struct FixedRetriever {
        documents: Vec<RetrievedDocument>,
    }

    #[async_trait::async_trait]
    impl DocumentRetriever for FixedRetriever {
        async fn retrieve(&self, _query: &str) -> AppResult<Vec<RetrievedDocument>> {
            Ok(self.documents.clone())
        }
    }

    #[tokio::test]
    async fn test_llm_step_appends_assistant_reply() {
        let client = Arc::new(RecordingClient::new("draft answer"));
        let step = LlmStep::new(client.clone(), AgentRole::Summarizer, "llama3.2")
            .with_temperature(0.3);

        let output = step.invoke(&[ChatMessage::user("question")]).await.unwrap();

        assert_eq!(output.messages.len(), 2);
        assert_eq!(
            last_content(&output.messages, ChatRole::Assistant),
            Some("draft answer")
        );
        assert!(output.documents.is_empty());

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].system.as_deref(),
            Some(AgentRole::Summarizer.instruction())
        );
        assert_eq!(seen[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_retriever_step_appends_tool_turn_and_documents() {
        let retriever = Arc::new(FixedRetriever {
            documents: vec![RetrievedDocument {
                content: "evidence text".to_string(),
                metadata: json!({"source": "doc.md"}),
            }],
        });
        let step = RetrieverStep::new(retriever);

        let output = step
            .invoke(&[ChatMessage::user("what is stored?")])
            .await
            .unwrap();

        let tool = last_content(&output.messages, ChatRole::Tool).unwrap();
        assert!(tool.contains("[0] doc.md"));
        assert!(tool.contains("evidence text"));
        assert_eq!(output.documents.len(), 1);
    }

    #[tokio::test]
    async fn test_retriever_step_requires_user_turn() {
        let retriever = Arc::new(FixedRetriever { documents: vec![] });
        let step = RetrieverStep::new(retriever);

        let result = step.invoke(&[]).await;
        assert!(result.is_err());
    }
}
