use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recoverable events collected during a run. None of these abort
/// whole-document generation: every variant is recovered at the point
/// of detection by leaving the affected region's template content
/// untouched, and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AssemblyIssue {
    /// A configured paraId or anchor does not exist in this template.
    /// The targeting transform becomes a no-op.
    #[error("region '{meaning}' not found (looked for {locator})")]
    RegionNotFound { meaning: String, locator: String },

    /// The extractor collaborator returned an unparsable payload.
    /// The deterministic keyword heuristic takes over per fact.
    #[error("extractor output malformed: {detail}")]
    MalformedExtractorOutput { detail: String },

    /// A numeric token could not be parsed. The field is skipped and
    /// the template's original value stays in place.
    #[error("ambiguous quantity for '{field}': {token:?}")]
    AmbiguousQuantity { field: String, token: String },

    /// A table row did not have the expected column shape and was
    /// skipped during decomposition.
    #[error("table row {row_index} skipped: {detail}")]
    TableStructureMismatch { row_index: usize, detail: String },
}
