//! LLM integration crate for critiq.
//!
//! Provider-agnostic, conversation-shaped LLM access. Every reasoning role in
//! the question-answering pipeline goes through the `LlmClient` trait defined
//! here.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - Future: OpenAI, Claude
//!
//! # Example
//! ```no_run
//! use critiq_llm::{ChatMessage, ChatRequest, LlmClient, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = ChatRequest::new(vec![ChatMessage::user("Hello!")], "llama3.2");
//! let response = client.chat(&request).await?;
//! println!("{}", response.message.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{
    last_content, ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmClient, LlmUsage,
};
pub use factory::create_client;
pub use providers::OllamaClient;
