//! Domain-specific errors.

use thiserror::Error;

/// Reasons a review invocation ends without a generated summary.
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Please select a folder containing .md files first.")]
    NoRootPathSelected,
    /// No eligible note under the root, or the chosen note could not be read.
    #[error("No .md files found in this folder.")]
    NotFound,
    #[error("Error: {0}")]
    ExternalCallFailure(String),
    #[error("Error: failed to render prompt template: {0}")]
    PromptTemplate(String),
}
