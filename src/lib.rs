//! Queryable knowledge base of immune cell types and gene sets.
//!
//! A directed labeled graph links genes, gene sets, and a cell-type
//! hierarchy; queries walk the hierarchy with per-celltype depth bounds
//! and merge gene-set dictionaries across the traversed neighborhood for
//! single-cell annotation workflows.

pub mod annotate;
pub mod cli;
pub mod construct;
pub mod error;
pub mod export;
pub mod graph;
pub mod kb;
pub mod observability;
pub mod types;

pub use error::{KbError, Result};
pub use graph::hierarchy::CelltypeHierarchy;
pub use graph::store::{GraphData, KnowledgeGraph};
pub use graph::traversal::{DepthLimit, HierarchyDirection};
pub use kb::{CelltypeProcessQuery, GraphSource, KnowledgeBase};
pub use types::{CelltypeProcessMap, EdgeClass, GeneSetAnnotation, GeneSetMap, NodeClass};
