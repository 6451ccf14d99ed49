//! Error type for the tools.

use thiserror::Error;

use dominion_core::error::{GameError, InvasionError};

/// Result alias for tool commands.
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Everything a tool command can fail with.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Loading or looking up game data failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The invasion was rejected or aborted.
    #[error("Invasion failed: {0}")]
    Invasion(#[from] InvasionError),

    /// Data files loaded but are inconsistent.
    #[error("{} data problem(s):\n  {}", .0.len(), .0.join("\n  "))]
    Validation(Vec<String>),

    /// Output could not be written as JSON.
    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}
