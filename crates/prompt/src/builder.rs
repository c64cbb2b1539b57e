//! Stage request builders.
//!
//! Each pipeline stage sends one user-turn message to its reasoning role.
//! The message bodies are Handlebars templates rendered with the stage's
//! inputs.

use critiq_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Evaluation request sent to the context critic.
///
/// Embeds the question and every chunk (labeled with its integer id by the
/// caller) plus the JSON shape the critic must respond with.
const CRITIC_REQUEST_TEMPLATE: &str = "\
Question: {{question}}

Retrieved Chunks to Evaluate:
{{chunk_listing}}

Analyze each chunk and provide your assessment in the following JSON format:
{
    \"chunks\": [
        {
            \"chunk_id\": 0,
            \"relevance\": \"HIGHLY_RELEVANT|MARGINAL|IRRELEVANT\",
            \"rationale\": \"Brief explanation\",
            \"keep\": true
        }
    ],
    \"summary\": \"Overall assessment of retrieval quality\",
    \"filtered_count\": 1
}";

/// Draft request sent to the summarizer.
const SUMMARY_REQUEST_TEMPLATE: &str = "\
Question: {{question}}

Context:
{{context}}";

/// Verification request sent to the verifier.
const VERIFY_REQUEST_TEMPLATE: &str = "\
Question: {{question}}

Context:
{{context}}

Draft Answer:
{{draft_answer}}

Please verify and correct the draft answer, removing any unsupported claims.";

#[derive(Serialize)]
struct CriticVars<'a> {
    question: &'a str,
    chunk_listing: &'a str,
}

#[derive(Serialize)]
struct SummaryVars<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct VerifyVars<'a> {
    question: &'a str,
    context: &'a str,
    draft_answer: &'a str,
}

/// Build the critic's evaluation request.
pub fn build_critic_request(question: &str, chunk_listing: &str) -> AppResult<String> {
    render_template(
        CRITIC_REQUEST_TEMPLATE,
        &CriticVars {
            question,
            chunk_listing,
        },
    )
}

/// Build the summarizer's draft request.
pub fn build_summary_request(question: &str, context: &str) -> AppResult<String> {
    render_template(SUMMARY_REQUEST_TEMPLATE, &SummaryVars { question, context })
}

/// Build the verifier's correction request.
pub fn build_verify_request(
    question: &str,
    context: &str,
    draft_answer: &str,
) -> AppResult<String> {
    render_template(
        VERIFY_REQUEST_TEMPLATE,
        &VerifyVars {
            question,
            context,
            draft_answer,
        },
    )
}

/// Render a Handlebars template with variables.
fn render_template<T: Serialize>(template: &str, variables: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("request", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("request", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    tracing::debug!("Rendered stage request ({} chars)", rendered.len());

    Ok(rendered)
}
