use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::cli::ArgParser;
use crate::data::join::{inner_join, JoinError};
use crate::data::loader::load_file;
use crate::data::model::Table;
use crate::data::writer::write_csv;
use crate::overlap::{Counting, JoinSizes, OverlapCounts};
use crate::prompt::{ask_or_default, choose_columns_with_retry, Console};
use crate::venn;

/// Base name offered for both output files.
pub const DEFAULT_OUTPUT: &str = "peaks_DEG";

// ---------------------------------------------------------------------------
// Inputs and key selections
// ---------------------------------------------------------------------------

/// The three tables being merged.
pub struct Inputs {
    pub peaklist1: Table,
    pub peaklist2: Table,
    pub expression: Table,
}

impl Inputs {
    pub fn load(peaklist1: &Path, peaklist2: &Path, expression: &Path) -> Result<Self> {
        Ok(Inputs {
            peaklist1: load_file(peaklist1)?,
            peaklist2: load_file(peaklist2)?,
            expression: load_file(expression)?,
        })
    }
}

/// Join key columns chosen for each table, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub peaklist1: Vec<String>,
    pub peaklist2: Vec<String>,
    pub expression: Vec<String>,
}

/// Ask for a key of `expected` columns, re-asking once on a count mismatch.
fn choose_matching(
    console: &mut dyn Console,
    table: &Table,
    role: &str,
    expected: usize,
) -> Result<Vec<String>> {
    let columns = choose_columns_with_retry(console, role, &table.columns)?;
    if columns.len() == expected {
        return Ok(columns);
    }
    console.say(&format!(
        "Merge Error: you must merge {role} on the same number of columns as peaklist1 ({expected}). \
         Please choose again below."
    ))?;
    let columns = choose_columns_with_retry(console, role, &table.columns)?;
    if columns.len() != expected {
        return Err(JoinError::KeyLengthMismatch {
            left: expected,
            right: columns.len(),
        }
        .into());
    }
    Ok(columns)
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Everything computed from the inputs and key selection.
pub struct Merged {
    /// peaklist1 ⋈ peaklist2
    pub shared: Table,
    /// shared ⋈ expression
    pub combined: Table,
    pub sizes: JoinSizes,
    pub counts: OverlapCounts,
}

/// Join the shared peaks (peaklist1 ⋈ peaklist2) with the expression table
/// and count the overlap regions.
pub fn merge(
    inputs: &Inputs,
    keys: &Selection,
    shared: Table,
    counting: Counting,
) -> Result<Merged, JoinError> {
    let Inputs {
        peaklist1,
        peaklist2,
        expression,
    } = inputs;

    let combined = inner_join(&shared, expression, &keys.peaklist1, &keys.expression)?;
    let sizes = merge_sizes(inputs, keys, &shared, &combined)?;
    info!(
        "shared peaks: {} rows ({} keys); with expression: {} rows ({} keys)",
        shared.len(),
        sizes.shared,
        combined.len(),
        sizes.triple
    );

    let counts = match counting {
        Counting::Legacy => OverlapCounts::legacy(&sizes),
        Counting::Sets => OverlapCounts::from_key_sets(
            &peaklist1.key_set(&keys.peaklist1)?,
            &peaklist2.key_set(&keys.peaklist2)?,
            &expression.key_set(&keys.expression)?,
        ),
    };

    Ok(Merged {
        shared,
        combined,
        sizes,
        counts,
    })
}

fn merge_sizes(
    inputs: &Inputs,
    keys: &Selection,
    shared: &Table,
    combined: &Table,
) -> Result<JoinSizes, JoinError> {
    let p1_expr = inner_join(
        &inputs.peaklist1,
        &inputs.expression,
        &keys.peaklist1,
        &keys.expression,
    )?;
    let p2_expr = inner_join(
        &inputs.peaklist2,
        &inputs.expression,
        &keys.peaklist2,
        &keys.expression,
    )?;
    Ok(JoinSizes {
        peaklist1: inputs.peaklist1.dedup_by_key(&keys.peaklist1)?.len(),
        peaklist2: inputs.peaklist2.dedup_by_key(&keys.peaklist2)?.len(),
        expression: inputs.expression.len(),
        shared: shared.dedup_by_key(&keys.peaklist1)?.len(),
        triple: combined.dedup_by_key(&keys.peaklist1)?.len(),
        peaklist1_expression: p1_expr.dedup_by_key(&keys.peaklist1)?.len(),
        peaklist2_expression: p2_expr.dedup_by_key(&keys.peaklist2)?.len(),
    })
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Written next to the diagram: the counts and joins behind it.
#[derive(Serialize)]
struct Summary<'a> {
    peaklist1: &'a str,
    peaklist2: &'a str,
    expression: &'a str,
    counting: Counting,
    regions: OverlapCounts,
    /// Abc, aBc, ABc, abC, AbC, aBC, ABC with A=peaklist1, B=expression, C=peaklist2
    venn3: [i64; 7],
    joins: JoinSizes,
    shared_rows: usize,
    rows_written: usize,
}

/// Files produced by a run.
#[derive(Debug)]
pub struct Written {
    pub table: PathBuf,
    pub diagram: PathBuf,
    pub summary: PathBuf,
}

/// Full interactive run, writing outputs into `out_dir`.
pub fn run(args: &ArgParser, console: &mut dyn Console, out_dir: &Path) -> Result<Written> {
    let inputs = Inputs::load(&args.peaklist1, &args.peaklist2, &args.expression)?;

    let cols1 = choose_columns_with_retry(console, "peaklist1", &inputs.peaklist1.columns)?;
    let cols2 = choose_matching(console, &inputs.peaklist2, "peaklist2", cols1.len())?;
    let shared = inner_join(&inputs.peaklist1, &inputs.peaklist2, &cols1, &cols2)
        .context("Please check the headers of the peak files; both files must have the chosen columns to merge")?;
    console.say(&format!("Shared peaks identified ({} rows).", shared.len()))?;

    let cols3 = choose_matching(console, &inputs.expression, "the RNA-seq file", cols1.len())?;
    let keys = Selection {
        peaklist1: cols1,
        peaklist2: cols2,
        expression: cols3,
    };
    let merged = merge(&inputs, &keys, shared, args.counting)?;
    console.say("Peak files merged with RNA-seq data.")?;
    merged.counts.report();
    if merged.combined.is_empty() {
        warn!("no key is shared by all three files; the output table is empty");
    }

    let output = if args.keep_duplicates {
        merged.combined
    } else {
        merged.combined.dedup_by_key(&keys.peaklist1)?
    };

    let table_name = ask_or_default(console, "Please specify the output filename", DEFAULT_OUTPUT)?;
    let table_path = out_dir.join(format!("{table_name}.csv"));
    write_csv(&output, &table_path)?;
    console.say(&format!("your csv will be saved as {}", table_path.display()))?;

    let diagram_name = ask_or_default(console, "Please specify name of venn diagram", DEFAULT_OUTPUT)?;
    let diagram_path = out_dir.join(format!("{diagram_name}.png"));
    console.say(&format!("your venn diagram will be saved as {}", diagram_path.display()))?;
    let labels = [
        inputs.peaklist1.name.as_str(),
        inputs.expression.name.as_str(),
        inputs.peaklist2.name.as_str(),
    ];
    venn::write_png(&merged.counts.as_venn3(), &labels, args.image_size, &diagram_path)
        .with_context(|| format!("writing {}", diagram_path.display()))?;

    let summary_path = out_dir.join(format!("{diagram_name}.json"));
    let summary = Summary {
        peaklist1: &inputs.peaklist1.name,
        peaklist2: &inputs.peaklist2.name,
        expression: &inputs.expression.name,
        counting: args.counting,
        regions: merged.counts,
        venn3: merged.counts.as_venn3(),
        joins: merged.sizes,
        shared_rows: merged.shared.len(),
        rows_written: output.len(),
    };
    let json = serde_json::to_string_pretty(&summary).context("serializing summary")?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("writing {}", summary_path.display()))?;
    info!("wrote summary to {}", summary_path.display());

    console.say("Saving Complete. Exiting.")?;
    Ok(Written {
        table: table_path,
        diagram: diagram_path,
        summary: summary_path,
    })
}
