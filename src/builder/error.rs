//! Build errors for template construction.

use thiserror::Error;

/// Errors that can occur when building a template graph.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("template name not specified. Call .name(prompt) before .build()")]
    MissingName,

    #[error("option template has no candidates. Construct it with option_entry or option_entry_async")]
    MissingOptions,
}
