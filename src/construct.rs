//! Build a knowledge base from edge lists and a gene-set annotation map.
//!
//! This is the authoring path: curators provide the cell-type hierarchy,
//! gene-set membership, and gene-set → cell-type linkage as flat edge
//! lists, plus a map classifying every gene set as a cellular process or a
//! cellular identity. Inconsistencies between the inputs are reported as
//! diagnostics and tolerated where the query engine can cope; an
//! unclassified gene set is a hard validation error.

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::error::{KbError, Result};
use crate::graph::store::KnowledgeGraph;
use crate::kb::KnowledgeBase;
use crate::types::{EdgeClass, GeneSetAnnotation, Metadata, NodeClass};

/// Construct a knowledge base from its four defining inputs.
///
/// - `celltype_edges`: `(child, parent)` pairs of the cell-type hierarchy
/// - `geneset_gene_edges`: `(gene_set, gene)` membership pairs
/// - `geneset_celltype_edges`: `(gene_set, cell_type)` linkage pairs
/// - `annotations`: gene set → process/identity classification
/// - `metadata`: optional per-node metadata to attach after construction
pub fn construct_kb(
    celltype_edges: &[(&str, &str)],
    geneset_gene_edges: &[(&str, &str)],
    geneset_celltype_edges: &[(&str, &str)],
    annotations: &HashMap<String, GeneSetAnnotation>,
    metadata: Option<&HashMap<String, Metadata>>,
) -> Result<KnowledgeBase> {
    // dedup preserving first occurrence so graph insertion order (and with
    // it every downstream iteration order) is reproducible
    let genes = unique(geneset_gene_edges.iter().map(|(_, gene)| *gene));
    let gene_sets = unique(
        geneset_gene_edges
            .iter()
            .chain(geneset_celltype_edges)
            .map(|(gs, _)| *gs),
    );
    let celltypes = unique(
        celltype_edges
            .iter()
            .flat_map(|(child, parent)| [*child, *parent]),
    );

    // sanity: every cell type referenced by a gene set should exist in the
    // hierarchy
    let hierarchy_set: HashSet<&str> = celltypes.iter().copied().collect();
    let mut missing_celltypes: Vec<&str> = geneset_celltype_edges
        .iter()
        .map(|(_, ct)| *ct)
        .filter(|ct| !hierarchy_set.contains(ct))
        .collect();
    missing_celltypes.sort_unstable();
    missing_celltypes.dedup();
    if missing_celltypes.is_empty() {
        info!("all cell types referenced by gene sets are contained in the hierarchy");
    } else {
        warn!(
            missing = ?missing_celltypes,
            "cell types referenced by gene sets are missing from the hierarchy; their linkage edges are dropped"
        );
    }

    // sanity: the two gene-set edge lists should cover the same gene sets
    let in_celltype_edges: HashSet<&str> =
        geneset_celltype_edges.iter().map(|(gs, _)| *gs).collect();
    let in_gene_edges: HashSet<&str> = geneset_gene_edges.iter().map(|(gs, _)| *gs).collect();
    if in_celltype_edges != in_gene_edges {
        warn!("gene sets in the cell-type linkage and gene membership edge lists are not identical");
    }

    // classify every gene set up front; unclassified sets are fatal
    let mut kind_of: HashMap<&str, GeneSetAnnotation> = HashMap::new();
    for gene_set in &gene_sets {
        let kind = annotations.get(*gene_set).ok_or_else(|| {
            KbError::Validation(format!(
                "gene set '{gene_set}' has no annotation; every gene set must be classified as cellular_process or cellular_identity"
            ))
        })?;
        kind_of.insert(*gene_set, *kind);
    }

    let mut graph = KnowledgeGraph::new();
    for gene in &genes {
        graph.add_node(*gene, NodeClass::Gene, Metadata::new());
    }
    for gene_set in &gene_sets {
        graph.add_node(*gene_set, NodeClass::GeneSet, Metadata::new());
    }
    for celltype in &celltypes {
        graph.add_node(*celltype, NodeClass::CellType, Metadata::new());
    }

    for (gene_set, gene) in geneset_gene_edges {
        graph.add_edge(gene_set, gene, EdgeClass::GeneOf)?;
    }
    for (child, parent) in celltype_edges {
        graph.add_edge(child, parent, EdgeClass::SubsetOf)?;
    }
    for (gene_set, celltype) in geneset_celltype_edges {
        if !hierarchy_set.contains(celltype) {
            continue; // reported above
        }
        let class = match kind_of[gene_set] {
            GeneSetAnnotation::CellularProcess => EdgeClass::ProcessOf,
            GeneSetAnnotation::CellularIdentity => EdgeClass::IdentityOf,
        };
        graph.add_edge(gene_set, celltype, class)?;
    }

    if let Some(metadata) = metadata {
        for (id, meta) in metadata {
            if graph.contains_node(id) {
                graph.set_metadata(id, meta.clone())?;
            } else {
                warn!(node = %id, "metadata refers to a node that does not exist, skipping");
            }
        }
    }

    KnowledgeBase::from_graph(graph)
}

fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(*item)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
