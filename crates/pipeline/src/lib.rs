//! Question-answering pipeline for critiq.
//!
//! A fixed four-stage flow answers one question per run: retrieval gathers
//! evidence chunks from a document store, a context critic scores and
//! filters them, a summarizer drafts an answer from the filtered context,
//! and a verifier checks the draft against the evidence. The critic is the
//! only stage allowed to degrade instead of fail.

pub mod chunks;
pub mod critic;
pub mod graph;
pub mod state;
pub mod step;

// Re-export commonly used types
pub use chunks::{chunk_listing, extract_chunks, Chunk};
pub use critic::{
    assess, fallback_assessment, parse_assessment, AssessError, AssessOutcome, Assessment,
    Relevance, RelevanceVerdict, NO_CHUNKS_RATIONALE,
};
pub use graph::{QaPipeline, RoleBindings};
pub use state::{QaReport, QaState};
pub use step::{
    DocumentRetriever, LlmStep, ReasoningStep, RetrievedDocument, RetrieverStep, StepOutput,
};
