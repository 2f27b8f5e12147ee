use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CasebookError, Result};

const EXTENSIONS: &[&str] = &["md", "markdown"];

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Markdown files under `root`, sorted by path. A single file is returned as is.
pub fn discover_documents(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let meta = std::fs::metadata(root)
        .map_err(|source| CasebookError::Io { path: root.to_path_buf(), source })?;
    if meta.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_markdown(entry.path()))
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}
