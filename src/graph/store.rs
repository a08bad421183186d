//! In-memory directed labeled graph underlying the knowledge base.
//!
//! Nodes are identified by string id and carry a class label plus optional
//! metadata; edges carry a class label. A `HashMap` name index sits next to
//! the petgraph `DiGraph` for O(1) id lookup. Nodes are never removed, so
//! petgraph's index iteration order is insertion order; every query in
//! this crate relies on that for deterministic results.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{KbError, Result};
use crate::types::{EdgeClass, Metadata, NodeClass};

/// Node count of the converted reference dataset (Cytopus v1.31).
pub const REFERENCE_NODE_COUNT: usize = 6113;
/// Edge count of the converted reference dataset (Cytopus v1.31).
pub const REFERENCE_EDGE_COUNT: usize = 10785;

// ---------------------------------------------------------------------------
// GraphStats
// ---------------------------------------------------------------------------

/// Aggregate size of the stored graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

// ---------------------------------------------------------------------------
// Node / Edge weights
// ---------------------------------------------------------------------------

/// A graph node: immutable identity plus class and metadata attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub class: NodeClass,
    pub metadata: Metadata,
}

impl Node {
    /// Look up an attribute by name, the way the attribute filter sees it:
    /// `"class"` resolves to the class label, anything else to metadata.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if name == "class" {
            Some(self.class.as_str())
        } else {
            self.metadata.get(name).map(String::as_str)
        }
    }
}

/// A graph edge weight. Endpoints live in the graph topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub class: EdgeClass,
}

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// One node in the serialized graph blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub class: NodeClass,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

/// One edge in the serialized graph blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    pub target: String,
    pub class: EdgeClass,
}

/// The opaque graph blob: a flat JSON document of node and edge records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

// ---------------------------------------------------------------------------
// KnowledgeGraph
// ---------------------------------------------------------------------------

/// Directed labeled graph of genes, gene sets, cell types, and (optionally)
/// annotated cells.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<Node, Edge>,
    index: HashMap<String, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Re-adding an existing id overwrites its class and
    /// metadata without disturbing edges.
    pub fn add_node(&mut self, id: impl Into<String>, class: NodeClass, metadata: Metadata) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&idx) => {
                let node = &mut self.graph[idx];
                node.class = class;
                node.metadata = metadata;
            }
            None => {
                let idx = self.graph.add_node(Node {
                    id: id.clone(),
                    class,
                    metadata,
                });
                self.index.insert(id, idx);
            }
        }
    }

    /// Merge extra metadata into an existing node.
    pub fn set_metadata(&mut self, id: &str, metadata: Metadata) -> Result<()> {
        let idx = self.require(id)?;
        self.graph[idx].metadata.extend(metadata);
        Ok(())
    }

    /// Insert a directed edge. Both endpoints must already exist; a second
    /// edge between the same ordered pair overwrites the first one's class.
    pub fn add_edge(&mut self, source: &str, target: &str, class: EdgeClass) -> Result<()> {
        let src = self.require(source)?;
        let dst = self.require(target)?;
        self.graph.update_edge(src, dst, Edge { class });
        Ok(())
    }

    fn require(&self, id: &str) -> Result<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| KbError::NodeNotFound(id.to_string()))
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Attribute lookup for a node id. Fails if the id does not exist.
    pub fn node(&self, id: &str) -> Result<&Node> {
        self.require(id).map(|idx| &self.graph[idx])
    }

    pub(crate) fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes().map(|n| n.id.as_str())
    }

    /// All edges as `(source, target, class)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, EdgeClass)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                e.weight().class,
            )
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            nodes: self.node_count(),
            edges: self.edge_count(),
        }
    }

    /// Neighbor indices of `idx` along edges of the given class. With
    /// `Outgoing` the iterator yields edge targets, with `Incoming` edge
    /// sources. Insertion order.
    pub(crate) fn class_neighbors(
        &self,
        idx: NodeIndex,
        class: EdgeClass,
        dir: Direction,
    ) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph
            .edges_directed(idx, dir)
            .filter(move |e| e.weight().class == class)
            .map(move |e| match dir {
                Direction::Outgoing => e.target(),
                Direction::Incoming => e.source(),
            })
    }

    /// Parent cell types of a cell type (targets of outgoing SUBSET_OF).
    pub fn subset_parents(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.require(id)?;
        Ok(self
            .class_neighbors(idx, EdgeClass::SubsetOf, Direction::Outgoing)
            .map(|n| self.graph[n].id.as_str())
            .collect())
    }

    /// Child cell types of a cell type (sources of incoming SUBSET_OF).
    pub fn subset_children(&self, id: &str) -> Result<Vec<&str>> {
        let idx = self.require(id)?;
        Ok(self
            .class_neighbors(idx, EdgeClass::SubsetOf, Direction::Incoming)
            .map(|n| self.graph[n].id.as_str())
            .collect())
    }

    // -----------------------------------------------------------------------
    // Blob load/save
    // -----------------------------------------------------------------------

    /// Rebuild a graph from its serialized form. Edges referencing unknown
    /// node ids make the blob invalid.
    pub fn from_data(data: GraphData) -> Result<Self> {
        let mut g = Self::new();
        for n in data.nodes {
            g.add_node(n.id, n.class, n.metadata);
        }
        for e in data.edges {
            g.add_edge(&e.source, &e.target, e.class)
                .map_err(|err| KbError::Validation(format!("bad edge in graph blob: {err}")))?;
        }
        Ok(g)
    }

    /// Serialize into the flat record form.
    pub fn to_data(&self) -> GraphData {
        GraphData {
            nodes: self
                .nodes()
                .map(|n| NodeRecord {
                    id: n.id.clone(),
                    class: n.class,
                    metadata: n.metadata.clone(),
                })
                .collect(),
            edges: self
                .edges()
                .map(|(s, t, class)| EdgeRecord {
                    source: s.to_string(),
                    target: t.to_string(),
                    class,
                })
                .collect(),
        }
    }

    /// Load a graph blob from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let data: GraphData = serde_json::from_str(&raw)?;
        Self::from_data(data)
    }

    /// Save the graph blob to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string(&self.to_data())?;
        fs::write(path, json)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
