//! Context critic: relevance assessment of retrieved chunks.
//!
//! Sends every chunk plus the question to the critic reasoning step, parses
//! its JSON verdict, then sorts and filters the chunks deterministically.
//! The critic's output is untrusted input: unparseable responses degrade to
//! a keep-everything assessment, out-of-range chunk references are dropped,
//! and any invocation failure passes the prior context through unchanged.
//! Nothing in this module fails the surrounding request.

use crate::chunks::{chunk_listing, Chunk};
use crate::step::ReasoningStep;
use critiq_core::{AppError, AppResult};
use critiq_llm::{last_content, ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Rationale used when there is nothing to evaluate.
pub const NO_CHUNKS_RATIONALE: &str = "No chunks retrieved to evaluate";

/// Relevance category assigned by the critic.
///
/// The critic is instructed to use the three known labels, but its output is
/// free text; unrecognized labels are preserved verbatim and rank alongside
/// `Marginal` when sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relevance {
    HighlyRelevant,
    Marginal,
    Irrelevant,
    Other(String),
}

impl Relevance {
    /// Parse a critic-supplied label.
    pub fn from_label(label: &str) -> Self {
        match label {
            "HIGHLY_RELEVANT" => Relevance::HighlyRelevant,
            "MARGINAL" => Relevance::Marginal,
            "IRRELEVANT" => Relevance::Irrelevant,
            other => Relevance::Other(other.to_string()),
        }
    }

    /// Wire label for this category.
    pub fn label(&self) -> &str {
        match self {
            Relevance::HighlyRelevant => "HIGHLY_RELEVANT",
            Relevance::Marginal => "MARGINAL",
            Relevance::Irrelevant => "IRRELEVANT",
            Relevance::Other(label) => label,
        }
    }

    /// Sort rank: HIGHLY_RELEVANT < MARGINAL < IRRELEVANT, unknown labels
    /// treated as MARGINAL.
    pub fn rank(&self) -> u8 {
        match self {
            Relevance::HighlyRelevant => 0,
            Relevance::Marginal | Relevance::Other(_) => 1,
            Relevance::Irrelevant => 2,
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Relevance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Relevance {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Relevance::from_label(&label))
    }
}

/// The critic's judgment of one chunk.
///
/// `chunk_id` references the ORIGINAL retrieval-ordered chunk list; it stays
/// an identifier after sorting, never a position in the sorted output. It is
/// signed because the critic may emit anything; ids outside `[0, len)` are
/// dropped at filter time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub chunk_id: i64,
    pub relevance: Relevance,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub keep: bool,
}

/// The full parsed output of one critic invocation.
///
/// Wire field name for the verdicts is `chunks`, matching the response shape
/// the critic is instructed to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "chunks", default)]
    pub verdicts: Vec<RelevanceVerdict>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub filtered_count: usize,
}

/// Why a critic response could not be parsed.
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("critic response is not a valid assessment: {0}")]
    InvalidJson(String),
}

/// Result of one relevance assessment.
#[derive(Debug, Clone)]
pub struct AssessOutcome {
    /// Filtered context, or the prior context when filtering kept nothing
    pub context: String,

    /// Human-readable analysis report
    pub rationale: String,

    /// All verdicts, sorted by relevance rank (stable within equal ranks)
    pub verdicts: Vec<RelevanceVerdict>,
}

/// Assess chunk relevance for a question.
///
/// Infallible at this boundary: a broken critic degrades relevance filtering
/// to a pass-through of `prior_context`, it never fails the request.
pub async fn assess(
    question: &str,
    chunks: &[Chunk],
    prior_context: &str,
    critic: &dyn ReasoningStep,
) -> AssessOutcome {
    if chunks.is_empty() {
        return AssessOutcome {
            context: prior_context.to_string(),
            rationale: NO_CHUNKS_RATIONALE.to_string(),
            verdicts: Vec::new(),
        };
    }

    match evaluate(question, chunks, critic).await {
        Ok(assessment) => finalize(question, chunks, prior_context, assessment),
        Err(e) => {
            tracing::warn!("Context critic failed, passing original context through: {}", e);
            AssessOutcome {
                context: prior_context.to_string(),
                rationale: format!("Context critic error: {}. Using original context.", e),
                verdicts: Vec::new(),
            }
        }
    }
}

/// Invoke the critic once and parse its response, degrading to the
/// keep-everything assessment when the response is unparseable.
async fn evaluate(
    question: &str,
    chunks: &[Chunk],
    critic: &dyn ReasoningStep,
) -> AppResult<Assessment> {
    let listing = chunk_listing(chunks);
    let request = critiq_prompt::build_critic_request(question, &listing)?;

    let output = critic.invoke(&[ChatMessage::user(request)]).await?;
    let reply = last_content(&output.messages, ChatRole::Assistant)
        .ok_or_else(|| AppError::Pipeline("Critic returned no assistant reply".to_string()))?;

    match parse_assessment(reply) {
        Ok(assessment) => Ok(assessment),
        Err(e) => {
            tracing::warn!("Falling back to keep-all assessment: {}", e);
            tracing::debug!("Raw critic response: {}", reply);
            Ok(fallback_assessment(chunks.len()))
        }
    }
}

/// Parse the critic's textual response into an [`Assessment`].
///
/// The response is expected to be a JSON object, possibly wrapped in a
/// fenced code block. Extraction order: a ```json fence, then a generic
/// fence, then the raw text.
pub fn parse_assessment(response: &str) -> Result<Assessment, AssessError> {
    let payload = extract_json_payload(response);

    serde_json::from_str(payload.trim()).map_err(|e| AssessError::InvalidJson(e.to_string()))
}

/// Strip a fenced code block from the response, if any.
fn extract_json_payload(response: &str) -> &str {
    let content = response.trim();

    if let Some(inner) = fenced_block(content, "```json") {
        return inner;
    }
    if let Some(inner) = fenced_block(content, "```") {
        return inner;
    }

    content
}

/// Text between an opening fence and the next closing fence; an unterminated
/// fence runs to the end of the response.
fn fenced_block<'a>(content: &'a str, fence: &str) -> Option<&'a str> {
    let start = content.find(fence)? + fence.len();
    let rest = &content[start..];

    Some(match rest.find("```") {
        Some(end) => &rest[..end],
        None => rest,
    })
}

/// Keep-everything assessment used when the critic's response cannot be
/// parsed. Degrades toward inclusion, never toward information loss.
pub fn fallback_assessment(chunk_count: usize) -> Assessment {
    Assessment {
        verdicts: (0..chunk_count)
            .map(|i| RelevanceVerdict {
                chunk_id: i as i64,
                relevance: Relevance::Marginal,
                rationale: "Parsing error - kept by default".to_string(),
                keep: true,
            })
            .collect(),
        summary: "JSON parsing failed - kept all chunks".to_string(),
        filtered_count: chunk_count,
    }
}

/// Sort, filter, and report on a parsed assessment.
fn finalize(
    question: &str,
    chunks: &[Chunk],
    prior_context: &str,
    assessment: Assessment,
) -> AssessOutcome {
    let Assessment {
        mut verdicts,
        summary,
        filtered_count,
    } = assessment;

    // Stable sort: equal ranks keep the critic's original order
    verdicts.sort_by_key(|v| v.relevance.rank());

    // Verdicts are untrusted: keep only in-range references
    let kept: Vec<&Chunk> = verdicts
        .iter()
        .filter(|v| v.keep && in_range(v.chunk_id, chunks.len()))
        .map(|v| &chunks[v.chunk_id as usize])
        .collect();

    tracing::debug!(
        "Critic kept {} of {} chunks (critic reported {})",
        kept.len(),
        chunks.len(),
        filtered_count
    );

    let context = if kept.is_empty() {
        // Filtering must never produce a strictly worse context than the one
        // we already had
        prior_context.to_string()
    } else {
        kept.iter()
            .map(|chunk| chunk.body.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let rationale = build_rationale(question, chunks.len(), kept.len(), &verdicts, &summary);

    AssessOutcome {
        context,
        rationale,
        verdicts,
    }
}

fn in_range(chunk_id: i64, chunk_count: usize) -> bool {
    chunk_id >= 0 && (chunk_id as usize) < chunk_count
}

/// Build the human-readable analysis report.
fn build_rationale(
    question: &str,
    retrieved: usize,
    kept: usize,
    verdicts: &[RelevanceVerdict],
    summary: &str,
) -> String {
    let mut lines = vec![
        format!("Context critic analysis for question: \"{}\"", question),
        String::new(),
        "Statistics:".to_string(),
        format!("  - Retrieved: {} chunks", retrieved),
        format!("  - Kept: {} chunks", kept),
        format!("  - Filtered: {} chunks", retrieved.saturating_sub(kept)),
        String::new(),
        "Chunk-by-chunk analysis:".to_string(),
        String::new(),
    ];

    for verdict in verdicts {
        let status = if verdict.keep { "KEPT" } else { "FILTERED" };
        lines.push(format!(
            "Chunk {} - {} [{}]",
            verdict.chunk_id, verdict.relevance, status
        ));

        let rationale = if verdict.rationale.is_empty() {
            "No rationale provided"
        } else {
            &verdict.rationale
        };
        lines.push(format!("  Rationale: {}", rationale));
        lines.push(String::new());
    }

    lines.push("Overall assessment:".to_string());
    let summary = if summary.is_empty() {
        "No summary provided"
    } else {
        summary
    };
    lines.push(format!("  {}", summary));
    lines.push(String::new());
    lines.push(format!(
        "Filtered context: keeping {} most relevant chunks",
        kept
    ));

    lines.join("\n")
}
