//! Bounded breadth-first traversal over the cell-type hierarchy.
//!
//! The hierarchy is the subgraph of cell_type nodes joined by SUBSET_OF
//! edges (child → parent). Walking edge direction yields ancestors
//! ("parents"), walking against it yields descendants ("children"). Every
//! traversal carries a depth limit and visits each node at most once, so
//! diamond-shaped hierarchies cannot duplicate results and cyclic input
//! cannot loop.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use tracing::warn;

use crate::error::{KbError, Result};
use crate::graph::store::KnowledgeGraph;
use crate::types::{EdgeClass, NodeClass};

// ---------------------------------------------------------------------------
// Depth limits and direction
// ---------------------------------------------------------------------------

/// How far a traversal may walk from its starting cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthLimit {
    /// Do not leave the starting node.
    SelfOnly,
    /// Walk at most this many hierarchy steps (`Bounded(0)` = self only,
    /// `Bounded(2)` = up to grandparents/grandchildren).
    Bounded(u32),
    /// Walk until the hierarchy runs out.
    #[default]
    Unbounded,
}

/// Which way to walk the hierarchy from a starting cell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyDirection {
    /// Ancestors: follow SUBSET_OF edges child → parent.
    Parents,
    /// Descendants: follow SUBSET_OF edges against their direction.
    Children,
}

impl HierarchyDirection {
    fn petgraph_direction(self) -> Direction {
        match self {
            Self::Parents => Direction::Outgoing,
            Self::Children => Direction::Incoming,
        }
    }

    /// Label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Parents => "parents",
            Self::Children => "children",
        }
    }
}

/// Per-query traversal configuration for one direction.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Depth applied to every queried cell type without an override.
    pub default_depth: DepthLimit,
    /// Explicit per-celltype depths; these win over `default_depth`.
    pub overrides: HashMap<String, DepthLimit>,
    /// Lenient mode: a queried cell type absent from the hierarchy gets an
    /// empty neighborhood and a diagnostic instead of failing the query.
    pub fill_missing: bool,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            default_depth: DepthLimit::Unbounded,
            overrides: HashMap::new(),
            fill_missing: true,
        }
    }
}

// ---------------------------------------------------------------------------
// BFS
// ---------------------------------------------------------------------------

/// Breadth-first walk from `start`, restricted to the cell-type subgraph.
///
/// The result begins with `start` and lists reachable cell types in BFS
/// order, each at most once. Fails with `CelltypeNotFound` if `start` is
/// not a cell-type node.
pub fn celltype_bfs(
    graph: &KnowledgeGraph,
    start: &str,
    direction: HierarchyDirection,
    depth: DepthLimit,
) -> Result<Vec<String>> {
    let start_idx = graph
        .node_index(start)
        .filter(|&idx| graph.node_at(idx).class == NodeClass::CellType)
        .ok_or_else(|| KbError::CelltypeNotFound(start.to_string()))?;

    if depth == DepthLimit::SelfOnly {
        return Ok(vec![start.to_string()]);
    }

    let mut visited = HashSet::from([start_idx]);
    let mut order = vec![start.to_string()];
    let mut queue = VecDeque::from([(start_idx, 0u32)]);

    while let Some((idx, level)) = queue.pop_front() {
        if let DepthLimit::Bounded(max) = depth {
            if level >= max {
                continue;
            }
        }
        for next in graph.class_neighbors(idx, EdgeClass::SubsetOf, direction.petgraph_direction())
        {
            // nothing stops a malformed blob from attaching a SUBSET_OF edge
            // to a non-cell_type node; keep the walk inside the subgraph
            if graph.node_at(next).class != NodeClass::CellType {
                continue;
            }
            if visited.insert(next) {
                order.push(graph.node_at(next).id.clone());
                queue.push_back((next, level + 1));
            }
        }
    }

    Ok(order)
}

/// Resolve the hierarchy neighborhood of every queried cell type.
///
/// Returns `(cell type, reachable cell types in BFS order)` pairs in query
/// order; the aggregation step's last-writer-wins merge depends on this
/// ordering being stable. Missing cell types follow the strict/lenient
/// policy in `opts`.
pub fn resolve_neighborhoods(
    graph: &KnowledgeGraph,
    celltypes: &[String],
    direction: HierarchyDirection,
    opts: &TraversalOptions,
) -> Result<Vec<(String, Vec<String>)>> {
    let mut neighborhoods = Vec::with_capacity(celltypes.len());
    for celltype in celltypes {
        let present = graph
            .node_index(celltype)
            .is_some_and(|idx| graph.node_at(idx).class == NodeClass::CellType);
        if !present {
            if opts.fill_missing {
                warn!(celltype = %celltype, "cell type not in knowledge base, adding empty neighborhood");
                neighborhoods.push((celltype.clone(), Vec::new()));
                continue;
            }
            return Err(KbError::CelltypeNotFound(celltype.clone()));
        }
        let depth = opts
            .overrides
            .get(celltype)
            .copied()
            .unwrap_or(opts.default_depth);
        neighborhoods.push((
            celltype.clone(),
            celltype_bfs(graph, celltype, direction, depth)?,
        ));
    }
    Ok(neighborhoods)
}

/// Report cell types reachable from more than one queried cell type.
///
/// Overlapping neighborhoods are legal (and often intended), so this is a
/// diagnostic only; the returned list is for callers that want to inspect
/// the overlap programmatically.
pub fn report_shared(
    direction: HierarchyDirection,
    neighborhoods: &[(String, Vec<String>)],
) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, reachable) in neighborhoods {
        for ct in reachable {
            *counts.entry(ct.as_str()).or_default() += 1;
        }
    }
    let mut shared: Vec<String> = counts
        .into_iter()
        .filter(|&(_, n)| n > 1)
        .map(|(ct, _)| ct.to_string())
        .collect();
    shared.sort();
    if !shared.is_empty() {
        warn!(
            kind = direction.label(),
            shared = ?shared,
            "queried cell types share hierarchy neighbors; this may be desired"
        );
    }
    shared
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use test_case::test_case;

    /// all-cells ← leukocyte ← T ← {CD4-T, CD8-T}; B ← leukocyte as well.
    fn hierarchy() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        for ct in ["all-cells", "leukocyte", "T", "B", "CD4-T", "CD8-T"] {
            g.add_node(ct, NodeClass::CellType, Metadata::new());
        }
        g.add_node("GZMB", NodeClass::Gene, Metadata::new());
        g.add_edge("leukocyte", "all-cells", EdgeClass::SubsetOf).unwrap();
        g.add_edge("T", "leukocyte", EdgeClass::SubsetOf).unwrap();
        g.add_edge("B", "leukocyte", EdgeClass::SubsetOf).unwrap();
        g.add_edge("CD4-T", "T", EdgeClass::SubsetOf).unwrap();
        g.add_edge("CD8-T", "T", EdgeClass::SubsetOf).unwrap();
        g
    }

    #[test_case(DepthLimit::SelfOnly, vec!["CD8-T"]; "self only")]
    #[test_case(DepthLimit::Bounded(0), vec!["CD8-T"]; "bounded zero")]
    #[test_case(DepthLimit::Bounded(1), vec!["CD8-T", "T"]; "one step")]
    #[test_case(DepthLimit::Bounded(2), vec!["CD8-T", "T", "leukocyte"]; "two steps")]
    #[test_case(DepthLimit::Unbounded, vec!["CD8-T", "T", "leukocyte", "all-cells"]; "unbounded")]
    fn parent_bfs_depths(depth: DepthLimit, expected: Vec<&str>) {
        let g = hierarchy();
        let got = celltype_bfs(&g, "CD8-T", HierarchyDirection::Parents, depth).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn children_walk_goes_down() {
        let g = hierarchy();
        let got =
            celltype_bfs(&g, "T", HierarchyDirection::Children, DepthLimit::Unbounded).unwrap();
        assert_eq!(got, vec!["T", "CD4-T", "CD8-T"]);
    }

    #[test]
    fn subset_edge_to_non_celltype_is_ignored() {
        let mut g = hierarchy();
        g.add_edge("GZMB", "T", EdgeClass::SubsetOf).unwrap();
        let got =
            celltype_bfs(&g, "T", HierarchyDirection::Children, DepthLimit::Unbounded).unwrap();
        assert_eq!(got, vec!["T", "CD4-T", "CD8-T"]);
    }

    #[test]
    fn bfs_rejects_non_celltype_start() {
        let g = hierarchy();
        let err = celltype_bfs(&g, "GZMB", HierarchyDirection::Parents, DepthLimit::Unbounded)
            .unwrap_err();
        assert!(matches!(err, KbError::CelltypeNotFound(_)));
    }

    #[test]
    fn diamond_counts_each_node_once() {
        let mut g = hierarchy();
        // second path CD8-T → leukocyte forms a diamond with CD8-T → T → leukocyte
        g.add_edge("CD8-T", "leukocyte", EdgeClass::SubsetOf).unwrap();
        let got = celltype_bfs(
            &g,
            "CD8-T",
            HierarchyDirection::Parents,
            DepthLimit::Unbounded,
        )
        .unwrap();
        assert_eq!(got, vec!["CD8-T", "T", "leukocyte", "all-cells"]);
    }

    #[test]
    fn cyclic_input_terminates() {
        let mut g = hierarchy();
        g.add_edge("all-cells", "CD8-T", EdgeClass::SubsetOf).unwrap();
        let got = celltype_bfs(
            &g,
            "T",
            HierarchyDirection::Parents,
            DepthLimit::Unbounded,
        )
        .unwrap();
        assert_eq!(got.len(), 4, "every node visited exactly once: {got:?}");
    }

    #[test]
    fn neighborhoods_respect_per_celltype_overrides() {
        let g = hierarchy();
        let opts = TraversalOptions {
            default_depth: DepthLimit::Bounded(1),
            overrides: HashMap::from([("CD8-T".to_string(), DepthLimit::SelfOnly)]),
            fill_missing: true,
        };
        let got = resolve_neighborhoods(
            &g,
            &["CD4-T".to_string(), "CD8-T".to_string()],
            HierarchyDirection::Parents,
            &opts,
        )
        .unwrap();
        assert_eq!(
            got,
            vec![
                ("CD4-T".to_string(), vec!["CD4-T".to_string(), "T".to_string()]),
                ("CD8-T".to_string(), vec!["CD8-T".to_string()]),
            ]
        );
    }

    #[test]
    fn missing_celltype_strict_vs_lenient() {
        let g = hierarchy();
        let lenient = TraversalOptions::default();
        let got = resolve_neighborhoods(
            &g,
            &["NK".to_string()],
            HierarchyDirection::Parents,
            &lenient,
        )
        .unwrap();
        assert_eq!(got, vec![("NK".to_string(), Vec::new())]);

        let strict = TraversalOptions {
            fill_missing: false,
            ..TraversalOptions::default()
        };
        let err = resolve_neighborhoods(
            &g,
            &["NK".to_string()],
            HierarchyDirection::Parents,
            &strict,
        )
        .unwrap_err();
        assert!(matches!(err, KbError::CelltypeNotFound(ct) if ct == "NK"));
    }

    #[test]
    fn shared_neighbors_are_reported() {
        let g = hierarchy();
        let opts = TraversalOptions::default();
        let neighborhoods = resolve_neighborhoods(
            &g,
            &["CD4-T".to_string(), "CD8-T".to_string()],
            HierarchyDirection::Parents,
            &opts,
        )
        .unwrap();
        let shared = report_shared(HierarchyDirection::Parents, &neighborhoods);
        assert_eq!(shared, vec!["T", "all-cells", "leukocyte"]);
    }

    #[test]
    fn disjoint_neighborhoods_report_nothing() {
        let g = hierarchy();
        let opts = TraversalOptions {
            default_depth: DepthLimit::SelfOnly,
            ..TraversalOptions::default()
        };
        let neighborhoods = resolve_neighborhoods(
            &g,
            &["CD4-T".to_string(), "CD8-T".to_string()],
            HierarchyDirection::Parents,
            &opts,
        )
        .unwrap();
        assert!(report_shared(HierarchyDirection::Parents, &neighborhoods).is_empty());
    }
}
