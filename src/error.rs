//! Error taxonomy for the knowledge base.
//!
//! Two fatal families: validation errors (malformed construction input,
//! unusable graph blobs) and lookup failures (a requested node, cell type,
//! or gene set is absent). Consistency problems the data model tolerates,
//! such as overlapping hierarchy branches or gene sets pointing at unknown
//! cell types, are never errors; they are reported through
//! `tracing::warn!` and the query continues with partial results.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KbError>;

/// All fatal error conditions raised by the knowledge base.
#[derive(Debug, Error)]
pub enum KbError {
    /// Malformed constructor or loader input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A node id was requested that does not exist in the graph.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A queried cell type is absent from the hierarchy (strict mode only).
    #[error("cell type not found in knowledge base: {0}")]
    CelltypeNotFound(String),

    /// A requested gene set is absent from the knowledge base.
    #[error("gene set not found: {0}")]
    GeneSetNotFound(String),

    /// The cell-type hierarchy contains a cycle. The data model assumes a
    /// DAG but nothing enforces acyclicity at construction time, so
    /// hierarchy extraction checks explicitly instead of looping forever.
    #[error("cycle detected in cell-type hierarchy at '{0}'")]
    HierarchyCycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
