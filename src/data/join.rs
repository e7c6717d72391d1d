use std::collections::{HashMap, HashSet};

use log::debug;

use super::model::{KeyTuple, Table};

/// Errors raised while joining or deduplicating tables.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    #[error("key column '{column}' not found in {table}")]
    KeyNotFound { column: String, table: String },

    #[error("Merge error: {left} key column(s) on the left but {right} on the right")]
    KeyLengthMismatch { left: usize, right: usize },

    #[error("no join key columns given")]
    EmptyKey,
}

// ---------------------------------------------------------------------------
// Inner join
// ---------------------------------------------------------------------------

/// Inner join of `left` and `right`, pairing `left_on[i]` with `right_on[i]`.
///
/// Output rows follow the left table's order; for each left row the matching
/// right rows appear in their original order.
///
/// Column naming follows `pandas.merge`:
/// * a right key column with the same name as its paired left key is
///   coalesced into the left one;
/// * any other name present on both sides gets `_x` (left) and `_y` (right).
///   Left key columns are never renamed so they stay addressable by the
///   caller's key list.
pub fn inner_join(
    left: &Table,
    right: &Table,
    left_on: &[String],
    right_on: &[String],
) -> Result<Table, JoinError> {
    if left_on.len() != right_on.len() {
        return Err(JoinError::KeyLengthMismatch {
            left: left_on.len(),
            right: right_on.len(),
        });
    }
    if left_on.is_empty() {
        return Err(JoinError::EmptyKey);
    }

    let left_idx = left.key_indices(left_on)?;
    let right_idx = right.key_indices(right_on)?;

    let coalesced: HashSet<usize> = left_on
        .iter()
        .zip(right_on)
        .zip(&right_idx)
        .filter(|((l, r), _)| l == r)
        .map(|(_, &ri)| ri)
        .collect();
    let right_kept: Vec<usize> = (0..right.columns.len())
        .filter(|i| !coalesced.contains(i))
        .collect();

    let columns = merged_columns(left, right, &left_idx, &right_kept);

    // key tuple -> right row numbers, in order
    let mut lookup: HashMap<KeyTuple, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows.iter().enumerate() {
        lookup
            .entry(Table::key_of(row, &right_idx))
            .or_default()
            .push(i);
    }

    let mut rows = Vec::new();
    for lrow in &left.rows {
        let Some(matches) = lookup.get(&Table::key_of(lrow, &left_idx)) else {
            continue;
        };
        for &ri in matches {
            let rrow = &right.rows[ri];
            let mut row = Vec::with_capacity(columns.len());
            row.extend(lrow.iter().cloned());
            row.extend(right_kept.iter().map(|&c| rrow[c].clone()));
            rows.push(row);
        }
    }

    debug!(
        "joined {} ({} rows) with {} ({} rows): {} rows",
        left.name,
        left.len(),
        right.name,
        right.len(),
        rows.len()
    );

    Ok(Table {
        name: format!("{} + {}", left.name, right.name),
        columns,
        rows,
    })
}

fn merged_columns(
    left: &Table,
    right: &Table,
    left_keys: &[usize],
    right_kept: &[usize],
) -> Vec<String> {
    let right_names: HashSet<&str> = right_kept
        .iter()
        .map(|&i| right.columns[i].as_str())
        .collect();
    let left_names: HashSet<&str> = left.columns.iter().map(String::as_str).collect();

    let mut columns: Vec<String> = left
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if right_names.contains(name.as_str()) && !left_keys.contains(&i) {
                format!("{name}_x")
            } else {
                name.clone()
            }
        })
        .collect();
    columns.extend(right_kept.iter().map(|&i| {
        let name = &right.columns[i];
        if left_names.contains(name.as_str()) {
            format!("{name}_y")
        } else {
            name.clone()
        }
    }));
    columns
}
