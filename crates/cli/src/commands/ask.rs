//! Ask command handler.
//!
//! Wires the retrieval store, the LLM provider, and the role bindings
//! together, then runs the question-answering pipeline.

use clap::Args;
use critiq_core::{config::AppConfig, AppError, AppResult};
use critiq_llm::create_client;
use critiq_pipeline::{LlmStep, QaPipeline, RetrieverStep, RoleBindings};
use critiq_prompt::AgentRole;
use critiq_store::StoreRetriever;
use std::sync::Arc;

/// Sampling temperature for the context critic; low for deterministic
/// judgments.
const CRITIC_TEMPERATURE: f32 = 0.2;

/// Ask a question against the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Print the filtered context after the answer
    #[arg(long)]
    pub show_context: bool,

    /// Print the context critic's analysis after the answer
    #[arg(long)]
    pub show_rationale: bool,

    /// Output the full result record as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        // 1. Validate the question
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config(
                "Question must be a non-empty string".to_string(),
            ));
        }

        // 2. The store must have been populated first
        let index_path = config.index_path();
        if !index_path.exists() {
            return Err(AppError::Store(format!(
                "No retrieval index at {:?}. Run 'critiq index <paths>' first.",
                index_path
            )));
        }

        // 3. Resolve provider endpoint and credentials
        let provider_config = config.get_provider_config(&config.provider);
        let endpoint = match provider_config {
            Some(critiq_core::config::ProviderConfig::Ollama { ref endpoint, .. }) => {
                Some(endpoint.clone())
            }
            Some(critiq_core::config::ProviderConfig::OpenAi { ref endpoint, .. }) => {
                endpoint.clone()
            }
            Some(critiq_core::config::ProviderConfig::Claude { ref endpoint, .. }) => {
                endpoint.clone()
            }
            None => None,
        };
        let api_key = config.resolve_api_key(&config.provider);

        // 4. Create the LLM client via the factory
        let client = create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
            .map_err(AppError::Config)?;

        // 5. Bind the four reasoning roles
        let top_k = self.top_k.unwrap_or(config.retrieval.top_k) as usize;
        let retriever = Arc::new(StoreRetriever::new(
            index_path,
            top_k,
            config.retrieval.min_score,
        ));

        let bindings = RoleBindings {
            retriever: Arc::new(RetrieverStep::new(retriever)),
            critic: Arc::new(
                LlmStep::new(client.clone(), AgentRole::ContextCritic, config.critic_model())
                    .with_temperature(CRITIC_TEMPERATURE),
            ),
            summarizer: Arc::new(LlmStep::new(
                client.clone(),
                AgentRole::Summarizer,
                &config.model,
            )),
            verifier: Arc::new(LlmStep::new(client, AgentRole::Verifier, &config.model)),
        };

        // 6. Run the shared pipeline
        let pipeline = QaPipeline::shared(bindings);
        let report = pipeline.run(question).await?;

        // 7. Output
        if self.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", report.answer);

            if self.show_context {
                println!();
                println!("--- Context ---");
                println!("{}", report.context);
            }

            if self.show_rationale {
                println!();
                println!("{}", report.context_rationale);
            }
        }

        Ok(())
    }
}
