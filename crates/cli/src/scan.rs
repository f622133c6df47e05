use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docload_ingest::LoaderKind;
use walkdir::WalkDir;

/// Loadable files (PDF, DOCX, Markdown) in `dir`, sorted by path.
pub fn document_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("cannot scan {}", dir.display()))?;
        if entry.file_type().is_file() && LoaderKind::is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
