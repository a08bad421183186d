//! Attribute-based node and edge selection.
//!
//! Nodes and edges get their own typed operations; both are pure queries
//! returning results in graph insertion order.

use std::collections::HashSet;

use crate::graph::store::KnowledgeGraph;

impl KnowledgeGraph {
    /// Node ids whose attribute value under `attribute_name` is a member of
    /// `attributes`. With `attribute_name = None` every node id is
    /// returned. Nodes lacking the attribute are skipped.
    pub fn filter_nodes(&self, attribute_name: Option<&str>, attributes: &[&str]) -> Vec<String> {
        let Some(name) = attribute_name else {
            return self.node_ids().map(str::to_string).collect();
        };
        self.nodes()
            .filter(|n| n.attribute(name).is_some_and(|v| attributes.contains(&v)))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Edges `(source, target)` whose attribute value under
    /// `attribute_name` is a member of `attributes`, further restricted to
    /// edges whose source lies in `origin` and/or whose destination lies in
    /// `target`. With `attribute_name = None` the class filter is skipped.
    pub fn filter_edges(
        &self,
        attribute_name: Option<&str>,
        attributes: &[&str],
        origin: Option<&HashSet<&str>>,
        target: Option<&HashSet<&str>>,
    ) -> Vec<(String, String)> {
        self.edges()
            .filter(|(_, _, class)| match attribute_name {
                // the only edge attribute in the data model is "class";
                // filtering on any other name matches nothing
                Some("class") => attributes.contains(&class.as_str()),
                Some(_) => false,
                None => true,
            })
            .filter(|(s, _, _)| origin.is_none_or(|set| set.contains(s)))
            .filter(|(_, t, _)| target.is_none_or(|set| set.contains(t)))
            .map(|(s, t, _)| (s.to_string(), t.to_string()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
