//! Gene-set export in the tab-separated GMT-style layout.
//!
//! One row per gene set: the set name followed by its genes, padded with
//! empty fields so every row has the same number of columns. Used for
//! interop with external gene-set-analysis tooling that expects a
//! rectangular table.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::types::GeneSetMap;

/// Write the gene-set table to `writer`. Rows appear in map key order.
pub fn write_gmt<W: Write>(gene_sets: &GeneSetMap, mut writer: W) -> Result<()> {
    let width = gene_sets.values().map(Vec::len).max().unwrap_or(0);
    for (name, genes) in gene_sets {
        write!(writer, "{name}")?;
        for gene in genes {
            write!(writer, "\t{gene}")?;
        }
        for _ in genes.len()..width {
            write!(writer, "\t")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the gene-set table to a file.
pub fn save_gmt(gene_sets: &GeneSetMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    write_gmt(gene_sets, file)?;
    info!(path = %path.display(), rows = gene_sets.len(), "gene sets exported");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
