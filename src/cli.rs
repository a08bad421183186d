//! Command-line interface: thin wrappers over the library queries.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{KbError, Result};
use crate::export::save_gmt;
use crate::kb::KnowledgeBase;

#[derive(Debug, Parser)]
#[command(name = "cytokb", version, about = "Query an immune cell-type knowledge base")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print size statistics of a knowledge-base graph blob.
    Info {
        /// Path to the graph blob (JSON).
        graph: PathBuf,
    },
    /// Export gene sets as a tab-separated table.
    ExportGmt {
        /// Path to the graph blob (JSON).
        graph: PathBuf,
        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
        /// Export identity gene sets instead of process gene sets.
        #[arg(long)]
        identities: bool,
        /// Restrict the export to these gene sets (process export only).
        #[arg(long, value_delimiter = ',')]
        gene_sets: Vec<String>,
    },
    /// Print the nested cell-type hierarchy as JSON.
    Hierarchy {
        /// Path to the graph blob (JSON).
        graph: PathBuf,
        /// Start from this cell type instead of spanning all roots.
        #[arg(long)]
        root: Option<String>,
        /// Nest ancestors above the root instead of descendants below it.
        #[arg(long, requires = "root")]
        invert: bool,
    },
}

/// Execute a parsed command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Info { graph } => {
            let kb = KnowledgeBase::from_path(graph)?;
            println!("{}", serde_json::to_string_pretty(&kb.stats())?);
        }
        Command::ExportGmt {
            graph,
            output,
            identities,
            gene_sets,
        } => {
            let kb = KnowledgeBase::from_path(graph)?;
            let selected = if identities {
                kb.identities().clone()
            } else if gene_sets.is_empty() {
                kb.processes().clone()
            } else {
                let requested: Vec<&str> = gene_sets.iter().map(String::as_str).collect();
                let resolved = kb.get_processes(&requested);
                let found: HashSet<&str> = resolved.keys().map(String::as_str).collect();
                for name in &requested {
                    if !found.contains(name) {
                        return Err(KbError::GeneSetNotFound(name.to_string()));
                    }
                }
                resolved
            };
            save_gmt(&selected, output)?;
        }
        Command::Hierarchy { graph, root, invert } => {
            let kb = KnowledgeBase::from_path(graph)?;
            let hierarchy = match root {
                Some(root) => kb.get_celltype_hierarchy(&root, invert)?,
                None => kb.full_hierarchy()?,
            };
            println!("{}", serde_json::to_string_pretty(&hierarchy)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_export_with_gene_set_list() {
        let cli = Cli::parse_from([
            "cytokb",
            "export-gmt",
            "kb.json",
            "-o",
            "out.gmt",
            "--gene-sets",
            "gs_a,gs_b",
        ]);
        match cli.command {
            Command::ExportGmt { gene_sets, .. } => {
                assert_eq!(gene_sets, vec!["gs_a", "gs_b"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
