use std::collections::HashSet;
use std::fmt;

use super::join::JoinError;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common Pandas dtypes.
/// Key tuples are hashed and ordered, so `CellValue` must be `Eq + Ord + Hash`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in sets and maps --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

/// Text form used for CSV output: `Null` is an empty field and integral
/// floats keep their `.0` so a re-read still yields a float.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw text field. `NaN` in any case reads as missing.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return if f.is_nan() {
                CellValue::Null
            } else {
                CellValue::Float(f)
            };
        }
        match s {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::String(s.to_string()),
        }
    }

    /// Form used when comparing join keys: a float holding an integral value
    /// compares equal to the matching integer, and NaN is missing.
    pub fn normalized(&self) -> CellValue {
        match self {
            CellValue::Float(v) if v.is_nan() => CellValue::Null,
            CellValue::Float(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 =>
            {
                CellValue::Integer(*v as i64)
            }
            other => other.clone(),
        }
    }
}

/// Normalised values of a row at the join-key columns.
pub type KeyTuple = Vec<CellValue>;

// ---------------------------------------------------------------------------
// Table – an in-memory data frame
// ---------------------------------------------------------------------------

/// Ordered columns and rows. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Where the table came from (file name or join description).
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table from rows, padding short rows with `Null` and
    /// truncating long ones.
    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Table {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at `row` in the named column.
    #[cfg(test)]
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Resolve key column names to positions.
    pub fn key_indices(&self, key: &[String]) -> Result<Vec<usize>, JoinError> {
        key.iter()
            .map(|col| {
                self.column_index(col).ok_or_else(|| JoinError::KeyNotFound {
                    column: col.clone(),
                    table: self.name.clone(),
                })
            })
            .collect()
    }

    pub(crate) fn key_of(row: &[CellValue], indices: &[usize]) -> KeyTuple {
        indices.iter().map(|&i| row[i].normalized()).collect()
    }

    /// Keep the first row for every distinct key tuple.
    pub fn dedup_by_key(&self, key: &[String]) -> Result<Table, JoinError> {
        let indices = self.key_indices(key)?;
        let mut seen: HashSet<KeyTuple> = HashSet::with_capacity(self.len());
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(Self::key_of(row, &indices)))
            .cloned()
            .collect();
        Ok(Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Distinct key tuples present in the table.
    pub fn key_set(&self, key: &[String]) -> Result<HashSet<KeyTuple>, JoinError> {
        let indices = self.key_indices(key)?;
        Ok(self
            .rows
            .iter()
            .map(|row| Self::key_of(row, &indices))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[fixture]
    fn peaks() -> Table {
        Table::from_rows(
            "peaks.csv",
            vec!["gene".into(), "start".into()],
            vec![
                vec![s("g1"), CellValue::Integer(10)],
                vec![s("g2"), CellValue::Integer(20)],
                vec![s("g1"), CellValue::Integer(30)],
                vec![s("g3"), CellValue::Integer(40)],
            ],
        )
    }

    #[rstest]
    #[case("", CellValue::Null)]
    #[case("42", CellValue::Integer(42))]
    #[case("-1.5", CellValue::Float(-1.5))]
    #[case("True", CellValue::Bool(true))]
    #[case("NaN", CellValue::Null)]
    #[case("nan", CellValue::Null)]
    #[case("chr1", CellValue::String("chr1".into()))]
    fn test_parse_guesses_type(#[case] raw: &str, #[case] expected: CellValue) {
        assert_eq!(CellValue::parse(raw), expected);
    }

    #[rstest]
    fn test_display_keeps_float_marker() {
        assert_eq!(CellValue::Float(2.0).to_string(), "2.0");
        assert_eq!(CellValue::Float(0.25).to_string(), "0.25");
        assert_eq!(CellValue::Null.to_string(), "");
    }

    #[rstest]
    fn test_integral_float_matches_integer_key() {
        assert_eq!(
            CellValue::Float(3.0).normalized(),
            CellValue::Integer(3).normalized()
        );
        assert_ne!(CellValue::Float(3.5).normalized(), CellValue::Integer(3));
    }

    #[rstest]
    fn test_nan_keys_are_one_missing_key() {
        let nan = CellValue::Float(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(nan.normalized(), CellValue::Null);

        let t = Table::from_rows(
            "t",
            vec!["gene".into(), "start".into()],
            vec![
                vec![nan.clone(), CellValue::Integer(1)],
                vec![CellValue::Float(-f64::NAN), CellValue::Integer(2)],
                vec![CellValue::Null, CellValue::Integer(3)],
            ],
        );
        let key = vec!["gene".to_string()];
        assert_eq!(t.dedup_by_key(&key).unwrap().len(), 1);
        assert_eq!(t.key_set(&key).unwrap().len(), 1);
    }

    #[rstest]
    fn test_dedup_keeps_first_occurrence(peaks: Table) {
        let dedup = peaks.dedup_by_key(&["gene".to_string()]).unwrap();
        assert_eq!(dedup.len(), 3);
        assert_eq!(dedup.get(0, "start"), Some(&CellValue::Integer(10)));
        assert_eq!(dedup.get(2, "gene"), Some(&s("g3")));
    }

    #[rstest]
    fn test_dedup_is_idempotent(peaks: Table) {
        let key = vec!["gene".to_string()];
        let once = peaks.dedup_by_key(&key).unwrap();
        let twice = once.dedup_by_key(&key).unwrap();
        assert_eq!(once, twice);
    }

    #[rstest]
    fn test_missing_key_column(peaks: Table) {
        let err = peaks.dedup_by_key(&["symbol".to_string()]).unwrap_err();
        assert!(matches!(err, JoinError::KeyNotFound { ref column, .. } if column == "symbol"));
    }

    #[rstest]
    fn test_from_rows_pads_short_rows() {
        let t = Table::from_rows(
            "t",
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Integer(1)]],
        );
        assert_eq!(t.rows[0], vec![CellValue::Integer(1), CellValue::Null]);
    }
}
