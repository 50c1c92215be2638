//! Knowledge compiler: turns loosely structured workbook sheets into the
//! three prompt blocks (core guide, type definitions, variable mapping).
//!
//! Sheets have no fixed schema. The compiler never fails on odd layouts:
//! a documentation sheet without a recognizable header is flattened into
//! plain lines instead of being rejected.

pub mod grid;
pub mod header;
pub mod render;
pub mod segment;
pub mod workbook;

use tracing::{debug, instrument, warn};

use sheetprompt_shared::{KnowledgeBlocks, Result, SheetNames};

pub use grid::Grid;
pub use header::{ColumnRoles, Header, locate_header};
pub use segment::{Entry, Guide, Section};
pub use workbook::{InMemoryWorkbook, JsonWorkbook, SheetSource};

/// Structured parse of a documentation sheet; `None` when no header exists.
pub fn parse_structured(grid: &Grid) -> Option<Guide> {
    locate_header(grid).map(|header| segment::segment(grid, &header))
}

/// Compile a documentation sheet into the core guide block.
pub fn compile_core_guide(grid: &Grid) -> String {
    match parse_structured(grid) {
        Some(guide) => {
            debug!(sections = guide.sections.len(), "parsed documentation sheet");
            render::render_core_guide(&guide)
        }
        None => {
            warn!(rows = grid.len(), "no header row found, flattening documentation sheet");
            render::flatten_core_guide(grid)
        }
    }
}

/// Compile a definitions sheet into a fenced `ts` block.
pub fn compile_type_definitions(grid: &Grid) -> String {
    render::render_type_definitions(grid)
}

/// Compile a mapping sheet into grouped path bullets.
pub fn compile_variable_mapping(grid: &Grid) -> String {
    render::render_variable_mapping(grid)
}

/// Compiles blocks from the sheets of one workbook.
#[derive(Debug, Clone)]
pub struct KnowledgeCompiler<S> {
    source: S,
}

impl<S: SheetSource> KnowledgeCompiler<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn core_guide(&self, sheet: &str) -> Result<String> {
        Ok(compile_core_guide(&self.source.sheet(sheet)?))
    }

    pub fn type_definitions(&self, sheet: &str) -> Result<String> {
        Ok(compile_type_definitions(&self.source.sheet(sheet)?))
    }

    pub fn variable_mapping(&self, sheet: &str) -> Result<String> {
        Ok(compile_variable_mapping(&self.source.sheet(sheet)?))
    }

    /// Compile all three blocks from the configured sheet names.
    #[instrument(skip_all, fields(documentation = %names.documentation))]
    pub fn compile_all(&self, names: &SheetNames) -> Result<KnowledgeBlocks> {
        Ok(KnowledgeBlocks {
            core_guide: self.core_guide(&names.documentation)?,
            type_definitions: self.type_definitions(&names.definitions)?,
            variable_mapping: self.variable_mapping(&names.mapping)?,
        })
    }
}
