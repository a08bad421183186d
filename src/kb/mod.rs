//! Knowledge-base facade: loading, derived views, and the public query API.
//!
//! A [`KnowledgeBase`] owns the graph exclusively. The derived views
//! (`celltypes`, `processes`, `identities`) are computed once while loading
//! and never mutated afterwards; a failed load never leaves a partially
//! built value behind because construction returns `Result<Self>`. Query
//! results are fully constructed before they are returned or cached, so a
//! caller never observes an interleaved partial write.

mod aggregate;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::graph::hierarchy::{extract_hierarchy, full_hierarchy, CelltypeHierarchy};
use crate::graph::store::KnowledgeGraph;
use crate::graph::traversal::{
    celltype_bfs, report_shared, resolve_neighborhoods, DepthLimit, HierarchyDirection,
    TraversalOptions,
};
use crate::types::{CelltypeProcessMap, EdgeClass, GeneSetMap};

pub(crate) use aggregate::gene_set_genes;

// ---------------------------------------------------------------------------
// GraphSource
// ---------------------------------------------------------------------------

/// Where a knowledge base comes from: a serialized blob on disk or a graph
/// already built in memory. Any other input shape is unrepresentable.
#[derive(Debug)]
pub enum GraphSource {
    Path(PathBuf),
    Graph(KnowledgeGraph),
}

impl From<PathBuf> for GraphSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for GraphSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<KnowledgeGraph> for GraphSource {
    fn from(graph: KnowledgeGraph) -> Self {
        Self::Graph(graph)
    }
}

// ---------------------------------------------------------------------------
// KbStats
// ---------------------------------------------------------------------------

/// Size summary of a loaded knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KbStats {
    pub nodes: usize,
    pub edges: usize,
    pub celltypes: usize,
    pub processes: usize,
    pub identities: usize,
}

// ---------------------------------------------------------------------------
// CelltypeProcessQuery
// ---------------------------------------------------------------------------

/// Parameters for [`KnowledgeBase::get_celltype_processes`].
///
/// Defaults merge parents one level up, merge all children, and handle
/// unknown cell types leniently.
#[derive(Debug, Clone)]
pub struct CelltypeProcessQuery {
    /// Cell types to retrieve gene sets for.
    pub celltypes: Vec<String>,
    /// Cell types whose gene sets are promoted into the shared "global"
    /// bucket. Downstream consumers expect at least one entry; an empty
    /// list is allowed but produces no global bucket (with a diagnostic).
    pub global_celltypes: Vec<String>,
    /// Also merge gene sets of hierarchy ancestors.
    pub get_parents: bool,
    /// Also merge gene sets of hierarchy descendants.
    pub get_children: bool,
    /// Default ancestor depth (overridable per cell type).
    pub parent_depth: DepthLimit,
    /// Default descendant depth (overridable per cell type).
    pub child_depth: DepthLimit,
    /// Per-celltype ancestor depth overrides.
    pub parent_depth_overrides: HashMap<String, DepthLimit>,
    /// Per-celltype descendant depth overrides.
    pub child_depth_overrides: HashMap<String, DepthLimit>,
    /// Lenient mode: unknown cell types get empty entries instead of
    /// failing the whole query.
    pub fill_missing: bool,
}

impl Default for CelltypeProcessQuery {
    fn default() -> Self {
        Self {
            celltypes: Vec::new(),
            global_celltypes: Vec::new(),
            get_parents: true,
            get_children: true,
            parent_depth: DepthLimit::Bounded(1),
            child_depth: DepthLimit::Unbounded,
            parent_depth_overrides: HashMap::new(),
            child_depth_overrides: HashMap::new(),
            fill_missing: true,
        }
    }
}

impl CelltypeProcessQuery {
    pub fn new<I, S>(celltypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            celltypes: celltypes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// The queryable knowledge base of cell types and gene sets.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    graph: KnowledgeGraph,
    celltypes: Vec<String>,
    processes: GeneSetMap,
    identities: GeneSetMap,
    last_celltype_processes: Option<CelltypeProcessMap>,
}

impl KnowledgeBase {
    /// Load a knowledge base from a blob path or a pre-built graph.
    pub fn load(source: impl Into<GraphSource>) -> Result<Self> {
        match source.into() {
            GraphSource::Path(path) => Self::from_graph(KnowledgeGraph::load(path)?),
            GraphSource::Graph(graph) => Self::from_graph(graph),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_graph(KnowledgeGraph::load(path)?)
    }

    /// Build the derived views over an in-memory graph.
    pub fn from_graph(graph: KnowledgeGraph) -> Result<Self> {
        let celltypes = graph.filter_nodes(Some("class"), &["cell_type"]);
        let celltype_set: HashSet<&str> = celltypes.iter().map(String::as_str).collect();

        // every gene set linked to a cell type through a process edge
        let process_sets: HashSet<&str> = graph
            .edges()
            .filter(|(_, t, class)| *class == EdgeClass::ProcessOf && celltype_set.contains(t))
            .map(|(s, _, _)| s)
            .collect();
        let processes = gene_set_genes(&graph, &process_sets);

        let identities = identities_for(&graph, &celltypes, &celltypes, false)?;

        info!(
            celltypes = celltypes.len(),
            processes = processes.len(),
            identities = identities.len(),
            "knowledge base loaded"
        );

        Ok(Self {
            graph,
            celltypes,
            processes,
            identities,
            last_celltype_processes: None,
        })
    }

    // -----------------------------------------------------------------------
    // Derived views
    // -----------------------------------------------------------------------

    /// All cell-type node ids, in graph insertion order.
    pub fn celltypes(&self) -> &[String] {
        &self.celltypes
    }

    /// Gene set → genes for every cellular-process gene set.
    pub fn processes(&self) -> &GeneSetMap {
        &self.processes
    }

    /// Cell type → identity genes for every cell type with an identity set.
    pub fn identities(&self) -> &GeneSetMap {
        &self.identities
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    /// Mutable graph access for the single-writer annotation extension.
    /// Derived views are load-time snapshots and are NOT recomputed; only
    /// additive cell annotation should go through here.
    pub fn graph_mut(&mut self) -> &mut KnowledgeGraph {
        &mut self.graph
    }

    /// The most recent [`Self::get_celltype_processes`] result, kept as a
    /// convenience copy.
    pub fn last_celltype_processes(&self) -> Option<&CelltypeProcessMap> {
        self.last_celltype_processes.as_ref()
    }

    pub fn stats(&self) -> KbStats {
        KbStats {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            celltypes: self.celltypes.len(),
            processes: self.processes.len(),
            identities: self.identities.len(),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Gene set → genes restricted to the requested gene sets. Requested
    /// names without gene membership edges are simply absent from the
    /// result.
    pub fn get_processes(&self, gene_sets: &[&str]) -> GeneSetMap {
        let origins: HashSet<&str> = gene_sets.iter().copied().collect();
        gene_set_genes(&self.graph, &origins)
    }

    /// Merged cell-type → gene-set dictionary across the queried hierarchy
    /// neighborhood. Merge precedence: children first, parents overwrite,
    /// "global" bucket re-attached last.
    ///
    /// The full result is returned and additionally retained under
    /// [`Self::last_celltype_processes`].
    pub fn get_celltype_processes(
        &mut self,
        query: &CelltypeProcessQuery,
    ) -> Result<CelltypeProcessMap> {
        for ct in query.celltypes.iter().chain(&query.global_celltypes) {
            if !self.celltypes.iter().any(|c| c == ct) {
                warn!(celltype = %ct, "cell type is not contained in the knowledge base");
            }
        }

        let parents = if query.get_parents {
            let opts = TraversalOptions {
                default_depth: query.parent_depth,
                overrides: query.parent_depth_overrides.clone(),
                fill_missing: query.fill_missing,
            };
            Some(resolve_neighborhoods(
                &self.graph,
                &query.celltypes,
                HierarchyDirection::Parents,
                &opts,
            )?)
        } else {
            None
        };

        let children = if query.get_children {
            let opts = TraversalOptions {
                default_depth: query.child_depth,
                overrides: query.child_depth_overrides.clone(),
                fill_missing: query.fill_missing,
            };
            Some(resolve_neighborhoods(
                &self.graph,
                &query.celltypes,
                HierarchyDirection::Children,
                &opts,
            )?)
        } else {
            None
        };

        let merged = aggregate::merge_process_map(
            &self.graph,
            &query.global_celltypes,
            &query.celltypes,
            parents.as_deref(),
            children.as_deref(),
        );

        if let Some(children) = &children {
            report_shared(HierarchyDirection::Children, children);
        }
        if let Some(parents) = &parents {
            report_shared(HierarchyDirection::Parents, parents);
        }

        self.last_celltype_processes = Some(merged.clone());
        Ok(merged)
    }

    /// Cell type → identity genes for the requested cell types. With
    /// `include_subsets` each requested cell type is first expanded to all
    /// of its hierarchy descendants.
    pub fn get_identities(&self, celltypes: &[&str], include_subsets: bool) -> Result<GeneSetMap> {
        let requested: Vec<String> = celltypes.iter().map(|s| s.to_string()).collect();
        identities_for(&self.graph, &requested, &self.celltypes, include_subsets)
    }

    /// Nested hierarchy rooted at `root`: descendants below it, or
    /// ancestors above it when `invert` is set.
    pub fn get_celltype_hierarchy(&self, root: &str, invert: bool) -> Result<CelltypeHierarchy> {
        extract_hierarchy(&self.graph, root, invert)
    }

    /// Nested hierarchy spanning every root cell type.
    pub fn full_hierarchy(&self) -> Result<CelltypeHierarchy> {
        full_hierarchy(&self.graph)
    }
}

// ---------------------------------------------------------------------------
// Identity resolution
// ---------------------------------------------------------------------------

fn identities_for(
    graph: &KnowledgeGraph,
    requested: &[String],
    known_celltypes: &[String],
    include_subsets: bool,
) -> Result<GeneSetMap> {
    let expanded: Vec<String> = if include_subsets {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for ct in requested {
            for member in
                celltype_bfs(graph, ct, HierarchyDirection::Children, DepthLimit::Unbounded)?
            {
                if seen.insert(member.clone()) {
                    out.push(member);
                }
            }
        }
        out
    } else {
        requested.to_vec()
    };

    let target_set: HashSet<&str> = expanded.iter().map(String::as_str).collect();
    let identity_edges = graph.filter_edges(Some("class"), &["identity_OF"], None, Some(&target_set));

    let origins: HashSet<&str> = identity_edges.iter().map(|(s, _)| s.as_str()).collect();
    let genes_by_set = gene_set_genes(graph, &origins);

    let mut identity_map = GeneSetMap::new();
    for (gene_set, celltype) in &identity_edges {
        if !known_celltypes.contains(celltype) {
            warn!(celltype = %celltype, "identity edge targets a node outside the hierarchy");
            continue;
        }
        let genes = match genes_by_set.get(gene_set) {
            Some(genes) => genes.clone(),
            None => {
                warn!(gene_set = %gene_set, "identity gene set has no member genes");
                Vec::new()
            }
        };
        // a second identity set for the same cell type wins
        identity_map.insert(celltype.clone(), genes);
    }
    Ok(identity_map)
}
