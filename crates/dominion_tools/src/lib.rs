//! # Dominion Development Tools
//!
//! Command-line tools for development:
//! - Data validators
//! - Single-invasion simulator

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod simulate;
pub mod validate;

pub use error::{ToolError, ToolResult};
