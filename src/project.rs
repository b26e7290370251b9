//! Project files: a JSON array of scenes, read before a run and rewritten after.

use anyhow::{Context, Result};
use rf_core::SceneItem;
use std::path::Path;

pub fn load(path: &Path) -> Result<Vec<SceneItem>> {
    if !path.exists() {
        anyhow::bail!("Project file does not exist: {:?}", path);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read project {}", path.display()))?;
    let mut scenes: Vec<SceneItem> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid project file {}", path.display()))?;
    scenes.sort_by_key(|s| s.order);
    Ok(scenes)
}

/// Write `scenes` back to `path` via a sibling temp file so a crash
/// never leaves a half-written project.
pub fn save(path: &Path, scenes: &[SceneItem]) -> Result<()> {
    let json = serde_json::to_string_pretty(scenes)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace project {}", path.display()))?;
    Ok(())
}
