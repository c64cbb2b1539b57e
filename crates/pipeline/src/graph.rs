//! Pipeline controller: the fixed-stage question-answering flow.
//!
//! One run moves through four stages in a fixed linear order, threading a
//! single state record forward; no stage reads state produced after it, and
//! no two stages overlap. Stage failures propagate and fail the run, except
//! inside the context critic, which self-isolates.

use crate::chunks::extract_chunks;
use crate::critic::assess;
use crate::state::{QaReport, QaState};
use crate::step::ReasoningStep;
use critiq_core::{AppError, AppResult};
use critiq_llm::{last_content, ChatMessage, ChatRole};
use critiq_prompt::{build_summary_request, build_verify_request};
use std::sync::{Arc, OnceLock};

/// Stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Retrieval,
    ContextCritic,
    Summarization,
    Verification,
}

/// The linear flow; no branching, no retries, no cycles.
const FLOW: [Stage; 4] = [
    Stage::Retrieval,
    Stage::ContextCritic,
    Stage::Summarization,
    Stage::Verification,
];

/// Reasoning-step bindings for the four roles.
///
/// Built once at process start from configuration and injected into the
/// pipeline constructor.
#[derive(Clone)]
pub struct RoleBindings {
    pub retriever: Arc<dyn ReasoningStep>,
    pub critic: Arc<dyn ReasoningStep>,
    pub summarizer: Arc<dyn ReasoningStep>,
    pub verifier: Arc<dyn ReasoningStep>,
}

/// The compiled question-answering pipeline.
///
/// Holds no per-request state; safe to share across concurrent requests.
pub struct QaPipeline {
    bindings: RoleBindings,
}

static SHARED: OnceLock<Arc<QaPipeline>> = OnceLock::new();

impl QaPipeline {
    /// Compile a pipeline from role bindings.
    pub fn new(bindings: RoleBindings) -> Self {
        Self { bindings }
    }

    /// Process-wide pipeline instance.
    ///
    /// Compiled exactly once, even under concurrent first use, and reused by
    /// every subsequent request. The first caller's bindings win; later
    /// bindings are ignored.
    pub fn shared(bindings: RoleBindings) -> Arc<QaPipeline> {
        SHARED
            .get_or_init(|| Arc::new(QaPipeline::new(bindings)))
            .clone()
    }

    /// Run the full flow for one question and return the terminal state.
    pub async fn run(&self, question: &str) -> AppResult<QaReport> {
        tracing::info!("Running QA pipeline");

        let mut state = QaState::new(question);

        for stage in FLOW {
            tracing::debug!("Entering stage {:?}", stage);
            match stage {
                Stage::Retrieval => self.retrieval(&mut state).await?,
                Stage::ContextCritic => self.context_critic(&mut state).await,
                Stage::Summarization => self.summarization(&mut state).await?,
                Stage::Verification => self.verification(&mut state).await?,
            }
        }

        Ok(state.into_report())
    }

    /// Retrieval stage: gather evidence and extract chunks.
    ///
    /// Writes `raw_chunks` and the consolidated context.
    async fn retrieval(&self, state: &mut QaState) -> AppResult<()> {
        let output = self
            .bindings
            .retriever
            .invoke(&[ChatMessage::user(state.question.clone())])
            .await?;

        // The consolidated context lives in the retrieval tool's turn; an
        // LLM-only retriever leaves it in its assistant reply instead.
        let context = last_content(&output.messages, ChatRole::Tool)
            .or_else(|| last_content(&output.messages, ChatRole::Assistant))
            .unwrap_or_default()
            .to_string();

        state.raw_chunks = extract_chunks(&context, &output.documents);
        tracing::info!("Retrieval produced {} chunks", state.raw_chunks.len());

        state.context = Some(context);
        Ok(())
    }

    /// Context critic stage: filter and reorder chunks.
    ///
    /// Replaces `context` with the filtered version and writes the rationale
    /// and verdicts. Self-isolating: a broken critic degrades filtering, it
    /// never fails the run.
    async fn context_critic(&self, state: &mut QaState) {
        let prior = state.context.clone().unwrap_or_default();

        let outcome = assess(
            &state.question,
            &state.raw_chunks,
            &prior,
            self.bindings.critic.as_ref(),
        )
        .await;

        state.context = Some(outcome.context);
        state.context_rationale = Some(outcome.rationale);
        state.chunk_relevance_scores = outcome.verdicts;
    }

    /// Summarization stage: draft an answer from the filtered context.
    ///
    /// Writes `draft_answer`. Answering only from the supplied context is a
    /// prompt-level contract, not enforced here.
    async fn summarization(&self, state: &mut QaState) -> AppResult<()> {
        let context = state.context.clone().unwrap_or_default();
        let request = build_summary_request(&state.question, &context)?;

        let output = self
            .bindings
            .summarizer
            .invoke(&[ChatMessage::user(request)])
            .await?;

        let draft = last_content(&output.messages, ChatRole::Assistant).ok_or_else(|| {
            AppError::Pipeline("Summarizer returned no assistant reply".to_string())
        })?;

        state.draft_answer = Some(draft.to_string());
        Ok(())
    }

    /// Verification stage: check the draft against the context.
    ///
    /// Writes `answer`.
    async fn verification(&self, state: &mut QaState) -> AppResult<()> {
        let context = state.context.clone().unwrap_or_default();
        let draft = state.draft_answer.clone().unwrap_or_default();
        let request = build_verify_request(&state.question, &context, &draft)?;

        let output = self
            .bindings
            .verifier
            .invoke(&[ChatMessage::user(request)])
            .await?;

        let answer = last_content(&output.messages, ChatRole::Assistant)
            .ok_or_else(|| AppError::Pipeline("Verifier returned no assistant reply".to_string()))?;

        state.answer = Some(answer.to_string());
        Ok(())
    }
}
