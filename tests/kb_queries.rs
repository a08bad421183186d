//! End-to-end tests over a small immune knowledge base built through the
//! construction interface, exercising the full query surface.

use std::collections::HashMap;

use cytokb::construct::construct_kb;
use cytokb::graph::hierarchy::graph_from_hierarchy;
use cytokb::kb::CelltypeProcessQuery;
use cytokb::types::GLOBAL_KEY;
use cytokb::{DepthLimit, GeneSetAnnotation, KbError, KnowledgeBase};
use pretty_assertions::assert_eq;

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const CELLTYPE_EDGES: &[(&str, &str)] = &[
    ("leukocyte", "all-cells"),
    ("T", "leukocyte"),
    ("B", "leukocyte"),
    ("NK", "leukocyte"),
    ("CD4-T", "T"),
    ("CD8-T", "T"),
];

const GENESET_GENE_EDGES: &[(&str, &str)] = &[
    ("all_macroautophagy_regulation_positive", "MTOR"),
    ("all_macroautophagy_regulation_positive", "ULK1"),
    ("gs_leukocyte_activation", "PTPRC"),
    ("gs_leukocyte_activation", "CD69"),
    ("gs_tcr_signaling", "LCK"),
    ("gs_tcr_signaling", "ZAP70"),
    ("gs_cytotoxicity", "GZMB"),
    ("gs_cytotoxicity", "PRF1"),
    ("gs_helper_cytokines", "IL4"),
    ("gs_helper_cytokines", "IL5"),
    ("gs_nk_cytotoxicity", "NKG7"),
    ("gs_nk_cytotoxicity", "KLRD1"),
    ("t_identity", "CD3D"),
    ("t_identity", "CD3E"),
    ("b_identity", "CD19"),
    ("b_identity", "MS4A1"),
    ("cd8_identity", "CD8A"),
    ("cd8_identity", "CD8B"),
];

const GENESET_CELLTYPE_EDGES: &[(&str, &str)] = &[
    ("all_macroautophagy_regulation_positive", "all-cells"),
    ("gs_leukocyte_activation", "leukocyte"),
    ("gs_tcr_signaling", "T"),
    ("gs_cytotoxicity", "CD8-T"),
    ("gs_helper_cytokines", "CD4-T"),
    ("gs_nk_cytotoxicity", "NK"),
    ("t_identity", "T"),
    ("b_identity", "B"),
    ("cd8_identity", "CD8-T"),
];

fn annotations() -> HashMap<String, GeneSetAnnotation> {
    let mut map = HashMap::new();
    for gs in [
        "all_macroautophagy_regulation_positive",
        "gs_leukocyte_activation",
        "gs_tcr_signaling",
        "gs_cytotoxicity",
        "gs_helper_cytokines",
        "gs_nk_cytotoxicity",
    ] {
        map.insert(gs.to_string(), GeneSetAnnotation::CellularProcess);
    }
    for gs in ["t_identity", "b_identity", "cd8_identity"] {
        map.insert(gs.to_string(), GeneSetAnnotation::CellularIdentity);
    }
    map
}

fn build_kb() -> KnowledgeBase {
    construct_kb(
        CELLTYPE_EDGES,
        GENESET_GENE_EDGES,
        GENESET_CELLTYPE_EDGES,
        &annotations(),
        None,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

#[test]
fn derived_views_are_populated_after_load() {
    let kb = build_kb();
    assert_eq!(kb.celltypes().len(), 7);
    assert_eq!(kb.processes().len(), 6);
    assert_eq!(kb.identities().len(), 3);

    // every process gene is reachable via a single gene_OF edge
    for (gene_set, genes) in kb.processes() {
        assert!(!genes.is_empty(), "{gene_set} has no genes");
        for gene in genes {
            assert!(GENESET_GENE_EDGES
                .iter()
                .any(|(gs, g)| gs == gene_set && g == gene));
        }
    }
}

#[test]
fn filtering_gene_nodes_returns_a_proper_subset() {
    let kb = build_kb();
    let genes = kb.graph().filter_nodes(Some("class"), &["gene"]);
    assert!(!genes.is_empty());
    assert!(genes.len() < kb.graph().node_count());
    assert!(genes.contains(&"MTOR".to_string()));
    assert!(!genes.contains(&"T".to_string()));
}

#[test]
fn get_processes_restricts_to_requested_sets() {
    let kb = build_kb();
    let map = kb.get_processes(&["all_macroautophagy_regulation_positive"]);
    assert_eq!(map.len(), 1);
    assert_eq!(
        map["all_macroautophagy_regulation_positive"],
        vec!["MTOR".to_string(), "ULK1".to_string()]
    );
    assert!(kb.get_processes(&["no_such_set"]).is_empty());
}

// ---------------------------------------------------------------------------
// get_celltype_processes
// ---------------------------------------------------------------------------

#[test]
fn default_query_merges_parents_and_children() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["CD8-T"]);
    query.global_celltypes = vec!["all-cells".to_string()];
    let result = kb.get_celltype_processes(&query).unwrap();

    let bucket = &result["CD8-T"];
    assert!(bucket.contains_key("gs_cytotoxicity"));
    // parent_depth defaults to one step: T's sets merge in, leukocyte's do not
    assert!(bucket.contains_key("gs_tcr_signaling"));
    assert!(!bucket.contains_key("gs_leukocyte_activation"));
    // identity sets never show up in the process dictionary
    assert!(!bucket.contains_key("cd8_identity"));

    assert_eq!(
        result[GLOBAL_KEY]["all_macroautophagy_regulation_positive"],
        vec!["MTOR".to_string(), "ULK1".to_string()]
    );

    // the facade retains the result as a convenience copy
    assert_eq!(kb.last_celltype_processes(), Some(&result));
}

#[test]
fn self_only_depth_returns_exactly_the_queried_celltype() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["T"]);
    query.global_celltypes = vec!["all-cells".to_string()];
    query.parent_depth = DepthLimit::Bounded(0);
    query.child_depth = DepthLimit::SelfOnly;
    let result = kb.get_celltype_processes(&query).unwrap();

    let bucket = &result["T"];
    assert_eq!(bucket.keys().collect::<Vec<_>>(), vec!["gs_tcr_signaling"]);
    assert_eq!(
        result.keys().collect::<Vec<_>>(),
        vec!["T", GLOBAL_KEY],
        "no other cell types appear in the result"
    );
}

#[test]
fn children_merge_pulls_descendant_sets() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["T"]);
    query.global_celltypes = vec!["all-cells".to_string()];
    query.get_parents = false;
    let result = kb.get_celltype_processes(&query).unwrap();

    let bucket = &result["T"];
    assert!(bucket.contains_key("gs_tcr_signaling"));
    assert!(bucket.contains_key("gs_cytotoxicity"));
    assert!(bucket.contains_key("gs_helper_cytokines"));
    assert!(!bucket.contains_key("gs_nk_cytotoxicity"));
}

#[test]
fn unknown_celltype_strict_mode_raises() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["ILC2"]);
    query.global_celltypes = vec!["all-cells".to_string()];
    query.fill_missing = false;
    let err = kb.get_celltype_processes(&query).unwrap_err();
    assert!(matches!(err, KbError::CelltypeNotFound(ct) if ct == "ILC2"));
}

#[test]
fn unknown_celltype_lenient_mode_fills_empty_entry() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["ILC2", "CD8-T"]);
    query.global_celltypes = vec!["all-cells".to_string()];
    let result = kb.get_celltype_processes(&query).unwrap();
    assert!(result["ILC2"].is_empty());
    assert!(result["CD8-T"].contains_key("gs_cytotoxicity"));
}

#[test]
fn global_merge_is_idempotent() {
    let mut kb = build_kb();
    let mut query = CelltypeProcessQuery::new(["CD8-T", "NK"]);
    query.global_celltypes = vec!["all-cells".to_string(), "leukocyte".to_string()];
    let first = kb.get_celltype_processes(&query).unwrap();
    let second = kb.get_celltype_processes(&query).unwrap();
    assert_eq!(first, second);

    let global = &first[GLOBAL_KEY];
    assert!(global.contains_key("all_macroautophagy_regulation_positive"));
    assert!(global.contains_key("gs_leukocyte_activation"));
    // promoted cell types no longer appear as their own keys
    assert!(!first.contains_key("all-cells"));
    assert!(!first.contains_key("leukocyte"));
}

#[test]
fn no_globals_yields_no_global_bucket() {
    let mut kb = build_kb();
    let query = CelltypeProcessQuery::new(["CD8-T"]);
    let result = kb.get_celltype_processes(&query).unwrap();
    assert!(!result.contains_key(GLOBAL_KEY));
    assert!(result.contains_key("CD8-T"));
}

// ---------------------------------------------------------------------------
// Identities and hierarchy
// ---------------------------------------------------------------------------

#[test]
fn identities_with_subsets_expand_descendants() {
    let kb = build_kb();
    let direct = kb.get_identities(&["T"], false).unwrap();
    assert_eq!(direct.keys().collect::<Vec<_>>(), vec!["T"]);

    let expanded = kb.get_identities(&["T"], true).unwrap();
    assert_eq!(expanded.keys().collect::<Vec<_>>(), vec!["CD8-T", "T"]);
    assert_eq!(
        expanded["CD8-T"],
        vec!["CD8A".to_string(), "CD8B".to_string()]
    );
}

#[test]
fn hierarchy_round_trips_through_nested_dict() {
    let kb = build_kb();
    let nested = kb.full_hierarchy().unwrap();
    let rebuilt = graph_from_hierarchy(&nested).unwrap();

    let mut original: Vec<String> = kb.celltypes().to_vec();
    let mut recovered: Vec<String> = rebuilt.node_ids().map(str::to_string).collect();
    original.sort();
    recovered.sort();
    assert_eq!(recovered, original);

    let mut original_edges = kb
        .graph()
        .filter_edges(Some("class"), &["SUBSET_OF"], None, None);
    let mut recovered_edges = rebuilt.filter_edges(Some("class"), &["SUBSET_OF"], None, None);
    original_edges.sort();
    recovered_edges.sort();
    assert_eq!(recovered_edges, original_edges);
}

#[test]
fn inverted_hierarchy_walks_ancestors() {
    let kb = build_kb();
    let nested = kb.get_celltype_hierarchy("CD8-T", true).unwrap();
    let celltypes = nested.celltypes();
    assert!(celltypes.contains("T"));
    assert!(celltypes.contains("all-cells"));
    assert!(!celltypes.contains("B"));
}

// ---------------------------------------------------------------------------
// Blob load/save
// ---------------------------------------------------------------------------

#[test]
fn kb_survives_a_blob_round_trip() {
    let kb = build_kb();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.json");
    kb.graph().save(&path).unwrap();

    let reloaded = KnowledgeBase::load(path.as_path()).unwrap();
    assert_eq!(reloaded.stats(), kb.stats());
    assert_eq!(reloaded.processes(), kb.processes());
    assert_eq!(reloaded.identities(), kb.identities());
}

#[test]
fn loading_garbage_blob_fails_with_serde_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("kb.json");
    std::fs::write(&path, "not a graph blob").unwrap();
    let err = KnowledgeBase::load(path.as_path()).unwrap_err();
    assert!(matches!(err, KbError::Serde(_)));
}
