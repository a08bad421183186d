//! Gene-set aggregation: building and merging cell-type → gene-set maps.
//!
//! The merge contract is last-writer-wins throughout, which only gives
//! reproducible output because every input sequence here is deterministic:
//! edges are visited in graph insertion order, neighborhoods in query
//! order, reachable cell types in BFS order.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::graph::store::KnowledgeGraph;
use crate::types::{CelltypeProcessMap, GeneSetMap, NodeClass, GLOBAL_KEY};

/// Resolve gene sets to their member genes through gene_OF edges
/// (gene set → gene). Gene sets without membership edges get no entry.
pub(crate) fn gene_set_genes(graph: &KnowledgeGraph, gene_sets: &HashSet<&str>) -> GeneSetMap {
    let genes: HashSet<&str> = graph
        .nodes()
        .filter(|n| n.class == NodeClass::Gene)
        .map(|n| n.id.as_str())
        .collect();
    let mut map = GeneSetMap::new();
    for (gene_set, gene) in
        graph.filter_edges(Some("class"), &["gene_OF"], Some(gene_sets), Some(&genes))
    {
        map.entry(gene_set).or_default().push(gene);
    }
    map
}

/// Build the merged cell-type → { gene set → genes } dictionary.
///
/// `parents` / `children` are the resolved hierarchy neighborhoods of the
/// queried cell types (`None` when that direction was not requested).
pub(crate) fn merge_process_map(
    graph: &KnowledgeGraph,
    global_celltypes: &[String],
    celltypes: &[String],
    parents: Option<&[(String, Vec<String>)]>,
    children: Option<&[(String, Vec<String>)]>,
) -> CelltypeProcessMap {
    // 1. resolved cell-type set: every reachable neighbor plus globals plus
    //    the queried cell types themselves
    let mut resolved: HashSet<&str> = HashSet::new();
    for neighborhoods in [children, parents].into_iter().flatten() {
        for (_, reachable) in neighborhoods {
            resolved.extend(reachable.iter().map(String::as_str));
        }
    }
    resolved.extend(global_celltypes.iter().map(String::as_str));
    resolved.extend(celltypes.iter().map(String::as_str));

    // 2. process edges into the resolved set; last edge per gene set wins,
    //    key order is first occurrence in edge insertion order
    let process_edges = graph.filter_edges(Some("class"), &["process_OF"], None, Some(&resolved));
    let mut gene_set_order: Vec<&str> = Vec::new();
    let mut gene_set_celltype: HashMap<&str, &str> = HashMap::new();
    for (gene_set, celltype) in &process_edges {
        match gene_set_celltype.insert(gene_set.as_str(), celltype.as_str()) {
            None => gene_set_order.push(gene_set),
            Some(previous) if previous != celltype => {
                warn!(
                    gene_set = %gene_set,
                    "process gene set is linked to multiple cell types; keeping the last edge"
                );
            }
            Some(_) => {}
        }
    }

    // 3. resolve member genes for every gene set seen
    let origins: HashSet<&str> = gene_set_order.iter().copied().collect();
    let genes_by_set = gene_set_genes(graph, &origins);

    // 4. provisional cell type → { gene set → genes }
    let mut process_dict = CelltypeProcessMap::new();
    for gene_set in &gene_set_order {
        let celltype = gene_set_celltype[gene_set];
        let genes = match genes_by_set.get(*gene_set) {
            Some(genes) => genes.clone(),
            None => {
                warn!(gene_set = %gene_set, "process gene set has no member genes");
                Vec::new()
            }
        };
        process_dict
            .entry(celltype.to_string())
            .or_default()
            .insert(gene_set.to_string(), genes);
    }

    // 5. promote designated globals into the shared bucket
    let has_globals = !global_celltypes.is_empty();
    if has_globals {
        let mut global_bucket = GeneSetMap::new();
        for celltype in global_celltypes {
            match process_dict.remove(celltype) {
                Some(sets) => global_bucket.extend(sets),
                None => {
                    warn!(celltype = %celltype, "cell type not found among process keys, cannot promote to global");
                }
            }
        }
        process_dict.insert(GLOBAL_KEY.to_string(), global_bucket);
    } else {
        warn!("no global cell types designated; the result will carry no \"global\" bucket");
    }

    // 6. merge neighborhoods into the queried cell types' buckets:
    //    children first, parents overwrite
    let mut merged = CelltypeProcessMap::new();
    for neighborhoods in [children, parents].into_iter().flatten() {
        for (celltype, reachable) in neighborhoods {
            let mut bucket = GeneSetMap::new();
            for member in reachable {
                if let Some(sets) = process_dict.get(member) {
                    bucket.extend(sets.clone());
                }
            }
            merged.entry(celltype.clone()).or_default().extend(bucket);
        }
    }

    if children.is_none() && parents.is_none() {
        merged = process_dict.clone();
    } else if has_globals {
        // 7. the global bucket survives merging unconditionally
        if let Some(global_bucket) = process_dict.get(GLOBAL_KEY) {
            merged.insert(GLOBAL_KEY.to_string(), global_bucket.clone());
        }
    }

    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
