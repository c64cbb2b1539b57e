//! Shared pipeline state.

use crate::chunks::Chunk;
use crate::critic::RelevanceVerdict;
use serde::Serialize;

/// The single mutable record threaded through the pipeline stages.
///
/// Each field is written once, by the stage that owns it, in strict stage
/// order; no stage overwrites a field it does not own. The one sanctioned
/// exception is `context`, which retrieval writes and the context critic
/// replaces with the filtered version. Lives for exactly one run.
#[derive(Debug, Clone, Default)]
pub struct QaState {
    /// The user's question, set at construction
    pub question: String,

    /// Consolidated evidence text (retrieval), then filtered context (critic)
    pub context: Option<String>,

    /// Evidence chunks in retrieval order; ids stay dense and stable
    pub raw_chunks: Vec<Chunk>,

    /// Critic's analysis report
    pub context_rationale: Option<String>,

    /// Critic's verdicts, sorted by relevance
    pub chunk_relevance_scores: Vec<RelevanceVerdict>,

    /// Summarizer's draft
    pub draft_answer: Option<String>,

    /// Verifier's final answer
    pub answer: Option<String>,
}

impl QaState {
    /// Initialize state for one question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    /// Extract the terminal result record.
    ///
    /// Called after the last stage; every field the stages own has been
    /// written by then.
    pub fn into_report(self) -> QaReport {
        QaReport {
            answer: self.answer.unwrap_or_default(),
            draft_answer: self.draft_answer.unwrap_or_default(),
            context: self.context.unwrap_or_default(),
            context_rationale: self.context_rationale.unwrap_or_default(),
            chunk_relevance_scores: self.chunk_relevance_scores,
        }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct QaReport {
    /// Final verified answer
    pub answer: String,

    /// Draft answer before verification
    pub draft_answer: String,

    /// Context the answer was grounded in
    pub context: String,

    /// Critic's analysis report
    pub context_rationale: String,

    /// Critic's verdicts, sorted by relevance
    pub chunk_relevance_scores: Vec<RelevanceVerdict>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_empty_except_question() {
        let state = QaState::new("What is X?");

        assert_eq!(state.question, "What is X?");
        assert!(state.context.is_none());
        assert!(state.raw_chunks.is_empty());
        assert!(state.context_rationale.is_none());
        assert!(state.chunk_relevance_scores.is_empty());
        assert!(state.draft_answer.is_none());
        assert!(state.answer.is_none());
    }

    #[test]
    fn test_into_report_carries_all_fields() {
        let mut state = QaState::new("q");
        state.context = Some("ctx".to_string());
        state.context_rationale = Some("why".to_string());
        state.draft_answer = Some("draft".to_string());
        state.answer = Some("final".to_string());

        let report = state.into_report();
        assert_eq!(report.answer, "final");
        assert_eq!(report.draft_answer, "draft");
        assert_eq!(report.context, "ctx");
        assert_eq!(report.context_rationale, "why");
    }
}
