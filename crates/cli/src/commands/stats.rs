//! Stats command handler.

use clap::Args;
use critiq_core::{config::AppConfig, AppError, AppResult};

/// Show retrieval store statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index_path = config.index_path();
        if !index_path.exists() {
            return Err(AppError::Store(format!(
                "No retrieval index at {:?}. Run 'critiq index <paths>' first.",
                index_path
            )));
        }

        let stats = critiq_store::stats(&index_path)?;

        if self.json {
            let json = serde_json::to_string_pretty(&stats)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("Sources: {}", stats.sources_count);
            println!("Chunks:  {}", stats.chunks_count);
            println!("DB size: {} bytes", stats.db_size_bytes);
        }

        Ok(())
    }
}
