//! Command handlers for the critiq CLI.

mod ask;
mod index;
mod stats;

pub use ask::AskCommand;
pub use index::IndexCommand;
pub use stats::StatsCommand;
