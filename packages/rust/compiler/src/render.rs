//! Markdown renderers for the three knowledge blocks.

use std::collections::{BTreeMap, BTreeSet};

use crate::grid::{self, Grid};
use crate::segment::{Guide, collapse_whitespace};

/// Title line shared by the structured and flattened core guide.
const CORE_GUIDE_TITLE: &str = "# CORE_GUIDE";

const CORE_GUIDE_INTRO: &str =
    "This block summarizes allowed runtime APIs and usage notes. Use only what appears here.";

/// Fixed footer closing every structured core guide.
pub const HOUSE_RULES: &str = "\n### House Rules\n\
- Use `DataRequest` for repeated variable reads.\n\
- Use `UnitCache` for per-unit intermediates; `GlobalCache` for shared values.\n\
- Validate inputs; handle missing/null values safely.\n\
- Write results via `Simulator.setData({ \"<Path>\": value })`.\n\
- No external libraries, filesystem, or network calls.";

const MAPPING_TITLE: &str = "# VARIABLE_PATH_MAPPING";

const MAPPING_INTRO: &str = "Use these path patterns; replace placeholders \
(e.g., <UnitName>, <StreamName>) with actual names.";

/// Known top-level namespaces, in display order. `Other` collects dotless paths.
pub const GROUP_ORDER: [&str; 7] = [
    "Tanks",
    "Streams",
    "Units",
    "Mixers",
    "FeedUnits",
    "Model",
    "Other",
];

/// Group label for paths without a dot.
pub const OTHER_GROUP: &str = "Other";

/// Render a segmented documentation sheet.
pub fn render_core_guide(guide: &Guide) -> String {
    let mut out = vec![CORE_GUIDE_TITLE.to_string(), CORE_GUIDE_INTRO.to_string()];

    for section in &guide.sections {
        if let Some(heading) = &section.heading {
            out.push(format!("\n## {heading}"));
        }
        for entry in &section.entries {
            out.push(format!("- **{}**", entry.name));
            if let Some(desc) = &entry.description {
                out.push(format!("  - _Desc:_ {desc}"));
            }
            if let Some(params) = &entry.parameters {
                out.push(format!("  - _Params:_ {}", collapse_whitespace(params)));
            }
            if let Some(returns) = &entry.returns {
                out.push(format!("  - _Returns:_ {returns}"));
            }
        }
    }

    out.push(HOUSE_RULES.to_string());
    out.join("\n")
}

/// Flatten a sheet with no recognizable header into plain lines.
///
/// Every non-blank row becomes one line of its non-empty cells, so no cell
/// content is lost.
pub fn flatten_core_guide(grid: &Grid) -> String {
    let lines: Vec<String> = grid
        .rows()
        .iter()
        .filter(|row| !grid::is_blank(row))
        .map(|row| {
            row.iter()
                .filter(|c| !c.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect();

    format!("{CORE_GUIDE_TITLE}\n\n{}", lines.join("\n"))
        .trim()
        .to_string()
}

/// Wrap the first-column lines of a definitions sheet in a `ts` fence.
pub fn render_type_definitions(grid: &Grid) -> String {
    let lines: Vec<String> = grid
        .first_column()
        .filter(|c| !c.is_empty())
        .map(|c| c.replace('\r', ""))
        .collect();
    let body = lines.join("\n");
    format!("```ts\n{}\n```", body.trim())
}

/// Group dotted paths from the first column by their top-level namespace.
pub fn render_variable_mapping(grid: &Grid) -> String {
    let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for raw in grid.first_column() {
        let path = raw.trim().trim_matches('"').trim();
        if path.is_empty() {
            continue;
        }
        let top = match path.split_once('.') {
            Some((prefix, _)) => prefix,
            None => OTHER_GROUP,
        };
        groups
            .entry(top.to_string())
            .or_default()
            .insert(path.to_string());
    }

    let mut keys: Vec<&String> = groups.keys().collect();
    keys.sort_by(|a, b| (group_rank(a), a).cmp(&(group_rank(b), b)));

    let mut out = vec![MAPPING_TITLE.to_string(), MAPPING_INTRO.to_string()];
    for key in keys {
        out.push(format!("\n## {key}"));
        for path in &groups[key] {
            out.push(format!("- `{path}`"));
        }
    }
    out.join("\n")
}

/// Position in [`GROUP_ORDER`]; unknown groups share the slot after it.
fn group_rank(group: &str) -> usize {
    GROUP_ORDER
        .iter()
        .position(|g| *g == group)
        .unwrap_or(GROUP_ORDER.len())
}
