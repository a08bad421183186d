//! Nested-dictionary view of the cell-type hierarchy.
//!
//! Extraction walks the SUBSET_OF subgraph with an explicit frame stack and
//! an on-path visited set: the data model assumes the hierarchy is a DAG
//! but never enforces it, so a cyclic blob must fail with
//! `HierarchyCycle` instead of recursing forever. The inverse operation
//! rebuilds a cell-type graph from a nested dictionary, which gives the
//! round-trip property used for compatibility testing.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::graph::store::KnowledgeGraph;
use crate::types::{EdgeClass, Metadata, NodeClass};

// ---------------------------------------------------------------------------
// CelltypeHierarchy
// ---------------------------------------------------------------------------

/// Nested map of cell types: each key maps to the subtree below (or above,
/// for inverted extraction) that cell type. Leaves carry empty maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CelltypeHierarchy(pub BTreeMap<String, CelltypeHierarchy>);

impl CelltypeHierarchy {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every cell type mentioned anywhere in the nested map.
    pub fn celltypes(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        let mut stack = vec![self];
        while let Some(level) = stack.pop() {
            for (name, sub) in &level.0 {
                out.insert(name.clone());
                stack.push(sub);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

struct Frame {
    id: String,
    pending: Vec<String>,
    built: BTreeMap<String, CelltypeHierarchy>,
}

fn neighbors(graph: &KnowledgeGraph, id: &str, invert: bool) -> Result<Vec<String>> {
    let list = if invert {
        graph.subset_parents(id)?
    } else {
        graph.subset_children(id)?
    };
    Ok(list.into_iter().map(str::to_string).collect())
}

/// Build the nested hierarchy rooted at `root`.
///
/// With `invert = false` the map nests descendants (children below the
/// root); with `invert = true` it nests ancestors. The root itself is the
/// single top-level key.
pub fn extract_hierarchy(
    graph: &KnowledgeGraph,
    root: &str,
    invert: bool,
) -> Result<CelltypeHierarchy> {
    if graph.node(root)?.class != NodeClass::CellType {
        return Err(KbError::CelltypeNotFound(root.to_string()));
    }

    let mut on_path: HashSet<String> = HashSet::from([root.to_string()]);
    let mut stack = vec![Frame {
        id: root.to_string(),
        pending: neighbors(graph, root, invert)?,
        built: BTreeMap::new(),
    }];

    loop {
        // unwrap is safe: the stack only empties through the return below
        let top = stack.last_mut().expect("non-empty frame stack");
        if let Some(next) = top.pending.pop() {
            if !on_path.insert(next.clone()) {
                return Err(KbError::HierarchyCycle(next));
            }
            let pending = neighbors(graph, &next, invert)?;
            stack.push(Frame {
                id: next,
                pending,
                built: BTreeMap::new(),
            });
        } else {
            let done = stack.pop().expect("non-empty frame stack");
            on_path.remove(&done.id);
            let subtree = CelltypeHierarchy(done.built);
            match stack.last_mut() {
                Some(parent) => {
                    parent.built.insert(done.id, subtree);
                }
                None => {
                    return Ok(CelltypeHierarchy(BTreeMap::from([(done.id, subtree)])));
                }
            }
        }
    }
}

/// Cell types with no parent in the hierarchy (in-degree 0 in the reversed
/// view), in graph insertion order.
pub fn hierarchy_roots(graph: &KnowledgeGraph) -> Vec<String> {
    graph
        .nodes()
        .filter(|n| n.class == NodeClass::CellType)
        .filter(|n| {
            graph
                .subset_parents(&n.id)
                .map(|p| p.is_empty())
                .unwrap_or(true)
        })
        .map(|n| n.id.clone())
        .collect()
}

/// Nested hierarchy spanning every root of the cell-type subgraph.
pub fn full_hierarchy(graph: &KnowledgeGraph) -> Result<CelltypeHierarchy> {
    let mut merged = BTreeMap::new();
    for root in hierarchy_roots(graph) {
        let CelltypeHierarchy(map) = extract_hierarchy(graph, &root, false)?;
        merged.extend(map);
    }
    Ok(CelltypeHierarchy(merged))
}

// ---------------------------------------------------------------------------
// Reconstruction
// ---------------------------------------------------------------------------

/// Rebuild a cell-type graph from a nested hierarchy: one cell_type node
/// per name and one child → parent SUBSET_OF edge per nesting step.
pub fn graph_from_hierarchy(hierarchy: &CelltypeHierarchy) -> Result<KnowledgeGraph> {
    let mut graph = KnowledgeGraph::new();
    let mut stack: Vec<(Option<String>, &CelltypeHierarchy)> = vec![(None, hierarchy)];
    while let Some((parent, level)) = stack.pop() {
        for (name, sub) in &level.0 {
            if !graph.contains_node(name) {
                graph.add_node(name.clone(), NodeClass::CellType, Metadata::new());
            }
            if let Some(parent) = &parent {
                graph.add_edge(name, parent, EdgeClass::SubsetOf)?;
            }
            stack.push((Some(name.clone()), sub));
        }
    }
    Ok(graph)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
