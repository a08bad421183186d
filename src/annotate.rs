//! Per-cell annotation extension and marker-gene labeling.
//!
//! `assign_cells` is the single mutation path of the crate: it attaches
//! cell barcodes to the hierarchy after load. It is single-writer by
//! contract: the knowledge base takes `&mut` and no query may run
//! concurrently with it. "Most granular wins" is decided by an explicit
//! SUBSET_OF reachability check, never by heuristics on the label strings.

use std::collections::BTreeMap;

use petgraph::Direction;
use tracing::warn;

use crate::error::Result;
use crate::graph::store::KnowledgeGraph;
use crate::graph::traversal::{celltype_bfs, DepthLimit, HierarchyDirection};
use crate::types::{EdgeClass, GeneSetMap, Metadata, NodeClass};

// ---------------------------------------------------------------------------
// Cell assignment
// ---------------------------------------------------------------------------

/// `ancestor` is reachable from `descendant` by walking child → parent
/// SUBSET_OF edges. A cell type is not its own ancestor here.
fn is_ancestor(graph: &KnowledgeGraph, ancestor: &str, descendant: &str) -> Result<bool> {
    let walk = celltype_bfs(
        graph,
        descendant,
        HierarchyDirection::Parents,
        DepthLimit::Unbounded,
    )?;
    Ok(walk.iter().skip(1).any(|ct| ct == ancestor))
}

/// Attach each cell barcode to its most granular matching cell type.
///
/// Every row is `(barcode, candidate labels)`; labels that are not
/// cell-type nodes are ignored. Among the matching labels the one that is
/// not an ancestor of any other match wins; incomparable branches fall
/// back to the first label in row order. Returns the number of cells
/// attached.
pub fn assign_cells(graph: &mut KnowledgeGraph, rows: &[(&str, Vec<&str>)]) -> Result<usize> {
    let mut attached = 0;
    for (barcode, labels) in rows {
        if graph.contains_node(barcode) {
            warn!(barcode = %barcode, "cell barcode already present, keeping existing assignment");
            continue;
        }
        let candidates: Vec<&str> = labels
            .iter()
            .copied()
            .filter(|label| {
                graph
                    .node(label)
                    .map(|n| n.class == NodeClass::CellType)
                    .unwrap_or(false)
            })
            .collect();
        if candidates.is_empty() {
            warn!(barcode = %barcode, "no label matches a hierarchy cell type, skipping cell");
            continue;
        }

        let mut winner = candidates[0];
        for &candidate in &candidates {
            let dominates = candidates
                .iter()
                .filter(|&&other| other != candidate)
                .try_fold(true, |acc, &other| {
                    is_ancestor(graph, candidate, other).map(|up| acc && !up)
                })?;
            if dominates {
                winner = candidate;
                break;
            }
        }

        graph.add_node(*barcode, NodeClass::Cell, Metadata::new());
        graph.add_edge(winner, barcode, EdgeClass::CellOf)?;
        attached += 1;
    }
    Ok(attached)
}

/// Barcodes attached to `celltype` and each of its hierarchy descendants,
/// keyed by the cell type they were assigned to.
pub fn cells_of(graph: &KnowledgeGraph, celltype: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let members = celltype_bfs(
        graph,
        celltype,
        HierarchyDirection::Children,
        DepthLimit::Unbounded,
    )?;
    let mut out = BTreeMap::new();
    for member in members {
        let idx = match graph.node_index(&member) {
            Some(idx) => idx,
            None => continue,
        };
        let barcodes: Vec<String> = graph
            .class_neighbors(idx, EdgeClass::CellOf, Direction::Outgoing)
            .map(|n| graph.node_at(n).id.clone())
            .collect();
        out.insert(member, barcodes);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Marker-gene labeling
// ---------------------------------------------------------------------------

/// Overlap coefficient: |a ∩ b| / min(|a|, |b|). Zero when either set is
/// empty.
pub fn overlap_coefficient(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let min_len = a.len().min(b.len());
    if min_len == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / min_len as f64
}

/// Best-matching gene set for one marker list.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLabel {
    /// Assigned label: the best gene-set name when its overlap clears the
    /// threshold, otherwise the original factor name.
    pub label: String,
    /// Name of the best-overlapping gene set, threshold or not.
    pub best_set: Option<String>,
    /// Overlap coefficient of `best_set`.
    pub coefficient: f64,
}

/// Label factors (named marker-gene lists) with the gene set each overlaps
/// most, keeping the factor's own name when no overlap clears `threshold`.
pub fn label_marker_genes(
    factors: &[(String, Vec<String>)],
    gene_sets: &GeneSetMap,
    threshold: f64,
) -> Vec<MarkerLabel> {
    factors
        .iter()
        .map(|(factor, markers)| {
            let mut best: Option<(&str, f64)> = None;
            for (name, genes) in gene_sets {
                let coefficient = overlap_coefficient(markers, genes);
                if best.is_none_or(|(_, c)| coefficient > c) {
                    best = Some((name, coefficient));
                }
            }
            match best {
                Some((name, coefficient)) if coefficient > threshold => MarkerLabel {
                    label: name.to_string(),
                    best_set: Some(name.to_string()),
                    coefficient,
                },
                Some((name, coefficient)) => MarkerLabel {
                    label: factor.clone(),
                    best_set: Some(name.to_string()),
                    coefficient,
                },
                None => MarkerLabel {
                    label: factor.clone(),
                    best_set: None,
                    coefficient: 0.0,
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
