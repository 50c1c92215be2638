//! Row classification and section grouping for documentation sheets.
//!
//! Rows after the header are one of: a section heading, a documentation
//! entry, a blank line, or noise (duplicate headers, rows whose content sits
//! only in columns no role maps to). Entries are grouped under the most
//! recent heading, preserving row order.

use std::sync::LazyLock;

use regex::Regex;

use crate::grid::{self, Grid};
use crate::header::{ColumnRoles, Header};

/// One documented function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub returns: Option<String>,
}

/// A heading and the entries that follow it.
///
/// Entries that appear before any heading land in a section with no heading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    pub entries: Vec<Entry>,
}

/// Structured view of a documentation sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guide {
    pub sections: Vec<Section>,
}

/// Classification of a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Blank,
    Heading(String),
    Entry(Entry),
    Noise,
}

/// Classify one row against the resolved header.
pub fn classify(row: &[String], header_row: &[String], roles: &ColumnRoles) -> RowKind {
    if grid::is_blank(row) {
        return RowKind::Blank;
    }

    let first = grid::cell(row, Some(0));
    let lower = first.to_lowercase();
    let only_first = !first.is_empty() && row.iter().skip(1).all(String::is_empty);
    if only_first || (lower.contains("class of") && lower.contains("functions")) {
        return RowKind::Heading(heading_label(first));
    }

    let name = grid::cell(row, roles.functions);
    let description = grid::cell(row, roles.description);
    if is_duplicate_header(row, header_row)
        || (name.eq_ignore_ascii_case("functions") && description.eq_ignore_ascii_case("description"))
    {
        return RowKind::Noise;
    }

    let parameters = grid::cell(row, roles.parameters);
    let returns = grid::cell(row, roles.returns);
    if [name, description, parameters, returns].iter().all(|c| c.is_empty()) {
        return RowKind::Noise;
    }

    RowKind::Entry(Entry {
        name: name.to_string(),
        description: non_empty(description),
        parameters: non_empty(parameters),
        returns: non_empty(returns),
    })
}

/// Walk every row after the header and group entries by section.
pub fn segment(grid: &Grid, header: &Header) -> Guide {
    let rows = grid.rows();
    let header_row = &rows[header.index];
    let mut sections = vec![Section::default()];

    for row in &rows[header.index + 1..] {
        match classify(row, header_row, &header.roles) {
            RowKind::Heading(label) => sections.push(Section {
                heading: Some(label),
                entries: Vec::new(),
            }),
            RowKind::Entry(entry) => {
                if let Some(current) = sections.last_mut() {
                    current.entries.push(entry);
                }
            }
            RowKind::Blank | RowKind::Noise => {}
        }
    }

    // The implicit leading section only matters when it owns entries.
    if sections[0].entries.is_empty() {
        sections.remove(0);
    }

    Guide { sections }
}

/// Turn a heading cell into a display label.
///
/// Text after the first "functions" is prose and dropped; the rest is
/// whitespace-collapsed and title cased.
pub fn heading_label(text: &str) -> String {
    static FUNCTIONS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)functions").expect("valid regex"));

    let kept = match FUNCTIONS_RE.find(text) {
        Some(m) => &text[..m.end()],
        None => text,
    };
    title_case(&collapse_whitespace(kept))
}

/// Join whitespace-separated words with single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase the first cased letter of each run of cased letters, lowercase
/// the rest. Uncased characters (digits, CJK, punctuation) end a run.
///
/// Uses the uppercase mapping; the few digraphs with a distinct titlecase
/// form (`ǆ` → `ǅ`) come out fully uppercased.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_lowercase() || ch.is_uppercase() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

fn is_duplicate_header(row: &[String], header_row: &[String]) -> bool {
    let width = row.len().max(header_row.len());
    (0..width).all(|i| grid::cell(row, Some(i)) == grid::cell(header_row, Some(i)))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::locate_header;

    fn header_row() -> Vec<String> {
        ["Functions", "Description", "Parameters", "Returns"]
            .map(String::from)
            .to_vec()
    }

    fn roles() -> ColumnRoles {
        ColumnRoles::resolve(&header_row())
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn heading_label_truncates_after_functions() {
        assert_eq!(
            heading_label("Simulator class of functionsProvides access to sim state"),
            "Simulator Class Of Functions"
        );
        assert_eq!(heading_label("  unitCache   helpers "), "Unitcache Helpers");
    }

    #[test]
    fn title_case_restarts_after_uncased_characters() {
        assert_eq!(heading_label("中abc functions"), "中Abc Functions");
        assert_eq!(title_case("2nd stage"), "2Nd Stage");
        assert_eq!(title_case("feed-unit MIXERS"), "Feed-Unit Mixers");
    }

    #[test]
    fn lone_first_cell_is_heading() {
        let kind = classify(&row(&["Global cache", "", ""]), &header_row(), &roles());
        assert_eq!(kind, RowKind::Heading("Global Cache".into()));
    }

    #[test]
    fn class_of_functions_is_heading_even_with_other_cells() {
        let kind = classify(
            &row(&["UnitCache class of functions", "stray note"]),
            &header_row(),
            &roles(),
        );
        assert_eq!(kind, RowKind::Heading("Unitcache Class Of Functions".into()));
    }

    #[test]
    fn duplicate_header_is_noise() {
        let kind = classify(&header_row(), &header_row(), &roles());
        assert_eq!(kind, RowKind::Noise);

        let kind = classify(&row(&["FUNCTIONS", "description", "", "x"]), &header_row(), &roles());
        assert_eq!(kind, RowKind::Noise);
    }

    #[test]
    fn content_outside_roles_is_noise() {
        let kind = classify(&row(&["", "", "", "", "orphan"]), &header_row(), &roles());
        assert_eq!(kind, RowKind::Noise);
    }

    #[test]
    fn data_row_keeps_present_fields() {
        let kind = classify(&row(&["getData", "Reads a value", "", "value"]), &header_row(), &roles());
        assert_eq!(
            kind,
            RowKind::Entry(Entry {
                name: "getData".into(),
                description: Some("Reads a value".into()),
                parameters: None,
                returns: Some("value".into()),
            })
        );
    }

    #[test]
    fn segment_groups_in_row_order() {
        let grid = Grid::from_rows([
            vec!["Functions", "Description", "Parameters", "Returns"],
            vec!["init", "Boot", "", ""],
            vec!["Simulator class of functions", "", "", ""],
            vec!["getData", "Reads", "path", "value"],
            vec!["", "", "", ""],
            vec!["setData", "Writes", "map", ""],
            vec!["Cache", "", "", ""],
        ]);
        let header = locate_header(&grid).expect("header");
        let guide = segment(&grid, &header);

        assert_eq!(guide.sections.len(), 3);
        assert_eq!(guide.sections[0].heading, None);
        assert_eq!(guide.sections[0].entries[0].name, "init");
        assert_eq!(
            guide.sections[1].heading.as_deref(),
            Some("Simulator Class Of Functions")
        );
        let names: Vec<_> = guide.sections[1].entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["getData", "setData"]);
        assert_eq!(guide.sections[2].heading.as_deref(), Some("Cache"));
        assert!(guide.sections[2].entries.is_empty());
    }
}
