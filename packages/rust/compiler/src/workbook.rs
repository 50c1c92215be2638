//! Workbook sources: where sheets come from.
//!
//! The compiler only needs "give me the grid for sheet X". [`JsonWorkbook`]
//! reads a workbook exported as JSON:
//!
//! ```json
//! { "sheets": { "Documentation": [["Functions", "Description"], ["getData", null]] } }
//! ```
//!
//! Cells may be any JSON value; they are normalized by [`Grid::from_values`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use sheetprompt_shared::{Result, SheetPromptError};

use crate::grid::Grid;

/// Anything that can hand out normalized sheets by name.
pub trait SheetSource {
    /// Load the named sheet. A missing sheet is a missing-resource error.
    fn sheet(&self, name: &str) -> Result<Grid>;
}

#[derive(Debug, Deserialize)]
struct WorkbookFile {
    #[serde(default)]
    sheets: BTreeMap<String, Vec<Vec<Value>>>,
}

/// A workbook stored as a single JSON file, decoded once at open time.
#[derive(Debug, Clone)]
pub struct JsonWorkbook {
    path: PathBuf,
    sheets: BTreeMap<String, Grid>,
}

impl JsonWorkbook {
    /// Open and decode the workbook. Fails if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SheetPromptError::missing("workbook", path));
        }

        let content = std::fs::read_to_string(path).map_err(|e| SheetPromptError::io(path, e))?;
        let file: WorkbookFile = serde_json::from_str(&content).map_err(|e| {
            SheetPromptError::Workbook(format!("failed to decode {}: {e}", path.display()))
        })?;

        let sheets = file
            .sheets
            .into_iter()
            .map(|(name, rows)| (name, Grid::from_values(rows)))
            .collect::<BTreeMap<_, _>>();

        debug!(path = %path.display(), sheets = sheets.len(), "opened workbook");
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names in sorted order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }
}

impl SheetSource for JsonWorkbook {
    fn sheet(&self, name: &str) -> Result<Grid> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| {
                SheetPromptError::missing("sheet", format!("{}#{name}", self.path.display()))
            })
    }
}

/// Sheets held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: BTreeMap<String, Grid>,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_sheet(mut self, name: impl Into<String>, grid: Grid) -> Self {
        self.sheets.insert(name.into(), grid);
        self
    }
}

impl SheetSource for InMemoryWorkbook {
    fn sheet(&self, name: &str) -> Result<Grid> {
        self.sheets
            .get(name)
            .cloned()
            .ok_or_else(|| SheetPromptError::missing("sheet", name))
    }
}
