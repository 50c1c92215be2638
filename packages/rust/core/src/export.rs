//! Write compiled knowledge blocks to disk.
//!
//! Layout:
//! ```text
//! <out>/
//! ├── core_guide.md
//! ├── type_definitions.md
//! ├── variable_mapping.md
//! └── blocks.json        (index with checksums)
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use sheetprompt_shared::{BlockKind, KnowledgeBlocks, Result, SheetPromptError};

/// Name of the index file written next to the blocks.
pub const INDEX_FILE: &str = "blocks.json";

/// Metadata for a single exported block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub block: BlockKind,
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Contents of `blocks.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockIndex {
    pub compiled_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactMeta>,
}

/// Write every block, then the index. Each file is written to a temp name
/// and renamed into place.
#[instrument(skip_all, fields(out = %out_dir.display()))]
pub fn export_blocks(out_dir: &Path, blocks: &KnowledgeBlocks) -> Result<BlockIndex> {
    std::fs::create_dir_all(out_dir).map_err(|e| SheetPromptError::io(out_dir, e))?;

    let mut artifacts = Vec::with_capacity(BlockKind::ALL.len());
    for kind in BlockKind::ALL {
        let filename = format!("{}.md", kind.as_str());
        let content = blocks.get(kind);
        write_atomic(out_dir, &filename, content)?;

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());

        debug!(file = %filename, size = content.len(), "wrote block");
        artifacts.push(ArtifactMeta {
            block: kind,
            filename,
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes: content.len(),
        });
    }

    let index = BlockIndex {
        compiled_at: Utc::now(),
        artifacts,
    };
    let json = serde_json::to_string_pretty(&index)?;
    write_atomic(out_dir, INDEX_FILE, &json)?;

    info!(count = index.artifacts.len(), "block export complete");
    Ok(index)
}

fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));
    std::fs::write(&temp, content).map_err(|e| SheetPromptError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| SheetPromptError::io(&target, e))?;
    Ok(())
}
