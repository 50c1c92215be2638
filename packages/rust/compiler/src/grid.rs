//! Normalized string grids.
//!
//! Workbook sheets arrive as rows of arbitrary JSON cells (strings, numbers,
//! nulls, or nothing at all). Everything downstream works on [`Grid`], where
//! each cell is BOM-free, trimmed text and absent cells read as `""`.

use serde_json::Value;

/// A rectangular-ish table of normalized text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Build a grid from raw JSON rows, normalizing every cell.
    pub fn from_values(rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(normalize_value).collect())
            .collect();
        Self { rows }
    }

    /// Build a grid from text rows, normalizing every cell.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| clean_cell(c.as_ref())).collect())
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first cell of every row, `""` for zero-width rows, in row order.
    pub fn first_column(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| cell(row, Some(0)))
    }
}

/// Cell at `idx`, or `""` when the column is absent or past the row's end.
pub fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map_or("", String::as_str)
}

/// True when every cell of the row is empty.
pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(String::is_empty)
}

/// Strip byte-order marks and surrounding whitespace.
pub fn clean_cell(raw: &str) -> String {
    raw.replace('\u{feff}', "").trim().to_string()
}

fn normalize_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => clean_cell(s),
        other => clean_cell(&other.to_string()),
    }
}
