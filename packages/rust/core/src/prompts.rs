//! Prompt assembly: workbook → knowledge blocks → rendered (system, user) pair.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use sheetprompt_compiler::{JsonWorkbook, KnowledgeCompiler, SheetSource};
use sheetprompt_shared::{KnowledgeBlocks, Result, SheetNames, SheetPromptError};

use crate::inject::{Substitutions, inject_blocks, is_reserved};

/// Fully rendered prompts for the first turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// File inputs for [`build_prompts_from_files`].
#[derive(Debug, Clone)]
pub struct PromptFiles {
    /// JSON workbook holding the three sheets.
    pub workbook: PathBuf,
    /// System prompt template.
    pub system_template: PathBuf,
    /// User prompt template (should contain `{USER_QUERY}`).
    pub user_template: PathBuf,
}

/// Read a template file. A missing file is a missing-resource error.
pub fn read_template(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SheetPromptError::missing("template", path));
    }
    let text = std::fs::read_to_string(path).map_err(|e| SheetPromptError::io(path, e))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// Render both templates from already compiled blocks.
///
/// The system template receives the blocks only. The user template receives
/// the blocks, the query, and any extra `token → value` placeholders, all in
/// one literal pass. Extra tokens that name a block or the query are dropped.
pub fn render_prompts(
    blocks: &KnowledgeBlocks,
    system_template: &str,
    user_template: &str,
    query: &str,
    extra_placeholders: &BTreeMap<String, String>,
) -> PromptPair {
    let system = inject_blocks(system_template, blocks);

    let user_subs = extra_placeholders
        .iter()
        .filter(|(token, _)| {
            let reserved = is_reserved(token);
            if reserved {
                warn!(token = %token, "extra placeholder shadows a block or query token; ignored");
            }
            !reserved
        })
        .fold(Substitutions::blocks(blocks), |subs, (token, value)| {
            subs.with(token, value)
        })
        .with_query(query);
    if !user_template.contains(crate::inject::QUERY_TOKEN) {
        debug!("user template has no query token; query will not appear in the prompt");
    }
    let user = user_subs.apply(user_template);

    PromptPair { system, user }
}

/// Compile blocks from `source` and render both templates.
pub fn build_prompts<S: SheetSource>(
    compiler: &KnowledgeCompiler<S>,
    sheets: &SheetNames,
    system_template: &str,
    user_template: &str,
    query: &str,
    extra_placeholders: &BTreeMap<String, String>,
) -> Result<PromptPair> {
    let blocks = compiler.compile_all(sheets)?;
    Ok(render_prompts(
        &blocks,
        system_template,
        user_template,
        query,
        extra_placeholders,
    ))
}

/// Open the workbook and templates from disk, then build the prompt pair.
#[instrument(skip_all, fields(workbook = %files.workbook.display()))]
pub fn build_prompts_from_files(
    files: &PromptFiles,
    sheets: &SheetNames,
    query: &str,
    extra_placeholders: &BTreeMap<String, String>,
) -> Result<PromptPair> {
    let compiler = KnowledgeCompiler::new(JsonWorkbook::open(&files.workbook)?);
    let system_template = read_template(&files.system_template)?;
    let user_template = read_template(&files.user_template)?;

    let pair = build_prompts(
        &compiler,
        sheets,
        &system_template,
        &user_template,
        query,
        extra_placeholders,
    )?;
    info!(
        system_len = pair.system.len(),
        user_len = pair.user.len(),
        "rendered prompts"
    );
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use sheetprompt_compiler::{Grid, InMemoryWorkbook};

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sp-prompts-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn workbook() -> InMemoryWorkbook {
        let names = SheetNames::default();
        InMemoryWorkbook::new()
            .with_sheet(
                &names.documentation,
                Grid::from_rows([
                    vec!["Functions", "Description"],
                    vec!["setData", "Writes { \"<Path>\": value }"],
                ]),
            )
            .with_sheet(&names.definitions, Grid::from_rows([vec!["type Path = string;"]]))
            .with_sheet(&names.mapping, Grid::from_rows([vec!["Units.FCCU.Intake"]]))
    }

    #[test]
    fn renders_system_and_user() {
        let compiler = KnowledgeCompiler::new(workbook());
        let pair = build_prompts(
            &compiler,
            &SheetNames::default(),
            "SYSTEM\n<<CORE_GUIDE>>\n<<TOPICAL_RULES>>\n{USER_QUERY}",
            "Paths:\n<<VARIABLE_PATH_MAPPING>>\nTask: {USER_QUERY}",
            "split the feed",
            &BTreeMap::new(),
        )
        .unwrap();

        assert!(pair.system.contains("- **setData**"));
        assert!(pair.system.contains("```ts\ntype Path = string;\n```"));
        // The query belongs to the user prompt only.
        assert!(pair.system.ends_with("{USER_QUERY}"));
        assert!(pair.user.contains("- `Units.FCCU.Intake`"));
        assert!(pair.user.ends_with("Task: split the feed"));
    }

    #[test]
    fn extra_placeholders_fill_user_template() {
        let mut extra = BTreeMap::new();
        extra.insert("{UNIT}".to_string(), "FCCU".to_string());
        let pair = render_prompts(
            &KnowledgeBlocks::default(),
            "sys {UNIT}",
            "unit {UNIT}: {USER_QUERY}",
            "q",
            &extra,
        );
        assert_eq!(pair.system, "sys {UNIT}");
        assert_eq!(pair.user, "unit FCCU: q");
    }

    #[test]
    fn extra_placeholders_cannot_replace_blocks_or_query() {
        let blocks = KnowledgeBlocks {
            core_guide: "GUIDE".into(),
            ..KnowledgeBlocks::default()
        };
        let mut extra = BTreeMap::new();
        extra.insert("<<CORE_GUIDE>>".to_string(), "HIJACK".to_string());
        extra.insert("<<TOPICAL_RULES>>".to_string(), "HIJACK".to_string());
        extra.insert("{USER_QUERY}".to_string(), "HIJACK".to_string());
        extra.insert("{UNIT}".to_string(), "FCCU".to_string());

        let pair = render_prompts(
            &blocks,
            "<<CORE_GUIDE>>",
            "<<CORE_GUIDE>> {UNIT} {USER_QUERY}",
            "q {UNIT}",
            &extra,
        );
        assert_eq!(pair.system, "GUIDE");
        assert_eq!(pair.user, "GUIDE FCCU q {UNIT}");
    }

    #[test]
    fn missing_template_is_reported_with_path() {
        let tmp = temp_dir();
        let err = read_template(&tmp.join("nope.txt")).unwrap_err();
        assert!(err.to_string().starts_with("template not found"));
        assert!(err.to_string().contains("nope.txt"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn from_files_end_to_end() {
        let tmp = temp_dir();
        let files = PromptFiles {
            workbook: tmp.join("rules.json"),
            system_template: tmp.join("system.txt"),
            user_template: tmp.join("user.txt"),
        };
        std::fs::write(
            &files.workbook,
            r#"{"sheets": {
                "Documentation": [["Functions", "Description"], ["getData", "Reads"]],
                "TypeDefinitions.d.ts": [["declare const x: number;"]],
                "AUS mapping v14.6": [["Streams.M1.Volume"]]
            }}"#,
        )
        .unwrap();
        std::fs::write(&files.system_template, "\u{feff}<<CORE_GUIDE>>").unwrap();
        std::fs::write(&files.user_template, "<<EXAMPLES_PLAYBOOK>>\n{USER_QUERY}").unwrap();

        let pair =
            build_prompts_from_files(&files, &SheetNames::default(), "go", &BTreeMap::new())
                .unwrap();
        assert!(pair.system.starts_with("# CORE_GUIDE"));
        assert!(pair.user.contains("## Streams"));
        assert!(pair.user.ends_with("\ngo"));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn from_files_missing_workbook_is_fatal() {
        let tmp = temp_dir();
        let files = PromptFiles {
            workbook: tmp.join("absent.json"),
            system_template: tmp.join("system.txt"),
            user_template: tmp.join("user.txt"),
        };
        let err = build_prompts_from_files(&files, &SheetNames::default(), "q", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, SheetPromptError::MissingResource { kind: "workbook", .. }));
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
