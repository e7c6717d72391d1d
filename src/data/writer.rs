use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use super::model::Table;

/// Write `table` as comma separated text with a header row.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(&table.columns)
        .context("writing CSV header")?;
    for (row_no, row) in table.rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_file;
    use crate::data::model::CellValue;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_written_csv_reads_back_unchanged() {
        let table = Table::from_rows(
            "peaks_DEG.csv",
            vec!["gene".into(), "chr_x".into(), "chr_y".into(), "logFC".into()],
            vec![
                vec![
                    CellValue::String("g1".into()),
                    CellValue::Integer(1),
                    CellValue::Integer(1),
                    CellValue::Float(2.0),
                ],
                vec![
                    CellValue::String("with, comma".into()),
                    CellValue::Null,
                    CellValue::Integer(3),
                    CellValue::Float(-0.125),
                ],
            ],
        );

        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("peaks_DEG.csv");
        write_csv(&table, &path).unwrap();

        let reread = load_file(&path).unwrap();
        assert_eq!(reread.columns, table.columns);
        assert_eq!(reread.rows, table.rows);
    }

    #[rstest]
    fn test_unwritable_path() {
        let table = Table::from_rows("t", vec!["a".into()], Vec::new());
        assert!(write_csv(&table, Path::new("/nonexistent-dir/out.csv")).is_err());
    }
}
