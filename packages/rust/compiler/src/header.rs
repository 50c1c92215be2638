//! Header row detection and column-role resolution.

use crate::grid::Grid;

/// Column positions for the four documentation roles.
///
/// `None` means the header has no matching column; lookups through
/// [`crate::grid::cell`] then yield `""`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub functions: Option<usize>,
    pub description: Option<usize>,
    pub parameters: Option<usize>,
    pub returns: Option<usize>,
}

impl ColumnRoles {
    /// Resolve each role to the first header cell containing its fragment.
    pub fn resolve(header: &[String]) -> Self {
        let find = |fragment: &str| {
            header
                .iter()
                .position(|c| c.to_lowercase().contains(fragment))
        };
        Self {
            functions: find("functions"),
            description: find("description"),
            parameters: find("parameters"),
            returns: find("returns"),
        }
    }
}

/// A located header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Row index of the header inside the grid.
    pub index: usize,
    pub roles: ColumnRoles,
}

/// Find the first row mentioning both "functions" and "description".
pub fn locate_header(grid: &Grid) -> Option<Header> {
    grid.rows().iter().enumerate().find_map(|(index, row)| {
        let joined = row.join(" | ").to_lowercase();
        (joined.contains("functions") && joined.contains("description")).then(|| Header {
            index,
            roles: ColumnRoles::resolve(row),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_header_below_preamble() {
        let grid = Grid::from_rows([
            vec!["Simulator API reference", "", ""],
            vec![],
            vec!["Returns", "Available Functions", "Description"],
        ]);
        let header = locate_header(&grid).expect("header");
        assert_eq!(header.index, 2);
        assert_eq!(header.roles.functions, Some(1));
        assert_eq!(header.roles.description, Some(2));
        assert_eq!(header.roles.returns, Some(0));
        assert_eq!(header.roles.parameters, None);
    }

    #[test]
    fn fragments_may_span_cells() {
        let grid = Grid::from_rows([vec!["FUNCTIONS", "DESCRIPTION", "Parameters"]]);
        let header = locate_header(&grid).expect("header");
        assert_eq!(header.roles.parameters, Some(2));
    }

    #[test]
    fn no_header_when_fragment_missing() {
        let grid = Grid::from_rows([vec!["Functions", "Notes"], vec!["getData", "x"]]);
        assert!(locate_header(&grid).is_none());
    }
}
