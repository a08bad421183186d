//! Core domain types for the knowledge base.
//!
//! Node and edge class labels follow the serialized graph format of the
//! reference dataset, so the `serde` rename strings here are wire-format
//! contracts, not cosmetic choices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// NodeClass
// ---------------------------------------------------------------------------

/// Class label carried by every node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// A single gene (e.g. "CD8A").
    #[serde(rename = "gene")]
    Gene,
    /// A named gene set describing a cellular process or identity.
    #[serde(rename = "gene_set")]
    GeneSet,
    /// A cell-type node in the hierarchy (e.g. "CD8-T", "leukocyte").
    #[serde(rename = "cell_type")]
    CellType,
    /// A single cell barcode, attached by the annotation extension.
    #[serde(rename = "cell")]
    Cell,
}

impl NodeClass {
    /// Attribute-value string used by the attribute filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gene => "gene",
            Self::GeneSet => "gene_set",
            Self::CellType => "cell_type",
            Self::Cell => "cell",
        }
    }
}

// ---------------------------------------------------------------------------
// EdgeClass
// ---------------------------------------------------------------------------

/// Class label carried by every edge in the graph.
///
/// Directions are part of the contract:
/// - `GeneOf`: gene set → gene
/// - `SubsetOf`: child cell type → parent cell type
/// - `ProcessOf` / `IdentityOf`: gene set → cell type
/// - `CellOf`: cell type → cell barcode (annotation extension only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeClass {
    #[serde(rename = "gene_OF")]
    GeneOf,
    #[serde(rename = "SUBSET_OF")]
    SubsetOf,
    #[serde(rename = "process_OF")]
    ProcessOf,
    #[serde(rename = "identity_OF")]
    IdentityOf,
    #[serde(rename = "cell_OF")]
    CellOf,
}

impl EdgeClass {
    /// Attribute-value string used by the attribute filter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneOf => "gene_OF",
            Self::SubsetOf => "SUBSET_OF",
            Self::ProcessOf => "process_OF",
            Self::IdentityOf => "identity_OF",
            Self::CellOf => "cell_OF",
        }
    }
}

// ---------------------------------------------------------------------------
// GeneSetAnnotation
// ---------------------------------------------------------------------------

/// Classification of a gene set supplied to the construction interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneSetAnnotation {
    #[serde(rename = "cellular_process")]
    CellularProcess,
    #[serde(rename = "cellular_identity")]
    CellularIdentity,
}

// ---------------------------------------------------------------------------
// Metadata and result maps
// ---------------------------------------------------------------------------

/// Free-form node metadata (category → value), set once at construction.
pub type Metadata = BTreeMap<String, String>;

/// Gene-set name → ordered gene list.
pub type GeneSetMap = BTreeMap<String, Vec<String>>;

/// Cell type → { gene-set name → gene list }, the shape returned by
/// `get_celltype_processes`. The reserved [`GLOBAL_KEY`] entry holds gene
/// sets promoted to be shared across all queried cell types.
pub type CelltypeProcessMap = BTreeMap<String, GeneSetMap>;

/// Reserved key for the shared gene-set bucket in a [`CelltypeProcessMap`].
pub const GLOBAL_KEY: &str = "global";
