//! Index command handler.
//!
//! Populates the local retrieval store from files and directories.

use clap::Args;
use critiq_core::{config::AppConfig, AppError, AppResult};
use critiq_store::IndexOptions;
use std::path::PathBuf;

/// Index documents into the retrieval store
#[derive(Args, Debug)]
pub struct IndexCommand {
    /// Files or directories to index
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Include patterns (substring match)
    #[arg(long)]
    pub include: Vec<String>,

    /// Exclude patterns (substring match)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Reset the store before indexing
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index command");

        let options = IndexOptions {
            paths: self.paths.clone(),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            reset: self.reset,
            chunk_size: config.retrieval.chunk_size as usize,
            chunk_overlap: config.retrieval.chunk_overlap as usize,
        };

        let stats = critiq_store::index_sources(&config.index_path(), &options)?;

        if self.json {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!(
                "Indexed {} sources ({} chunks, {} bytes) in {:.2}s",
                stats.sources_count, stats.chunks_count, stats.bytes_processed, stats.duration_secs
            );
        }

        Ok(())
    }
}
