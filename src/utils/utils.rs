use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lists the `.vtk` files directly inside `dir`, sorted by file name.
pub fn list_vtk_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to read entry of {}", dir.display()))?
            .path();
        let is_vtk = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("vtk"));
        if is_vtk && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// `<dir>/<stem><suffix>.vtk`
pub fn suffixed_vtk_path(dir: &Path, stem: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{}{}.vtk", stem, suffix))
}

/// File stem as an owned string, `None` for paths without a UTF-8 stem.
pub fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
}
