use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::sources::PARQUET_EXTENSION;

/// Filesystem transport that lists columnar tables under a root.
pub struct TableScan {
    root: PathBuf,
    follow_links: bool,
}

impl TableScan {
    /// Create a scan rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: false,
        }
    }

    /// Configure symlink traversal.
    pub fn with_follow_symlinks(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// All `.parquet` files under the root, sorted by path.
    ///
    /// A missing root yields an empty list; callers decide whether that is fatal.
    pub fn parquet_files(&self) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(&self.root);
        if self.follow_links {
            walker = walker.follow_links(true);
        }
        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_parquet_file(path))
            .collect();
        files.sort();
        files
    }
}

/// True if the path has a `.parquet` extension (case-insensitive).
pub fn is_parquet_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PARQUET_EXTENSION))
        .unwrap_or(false)
}

/// Lowercased file stem, or `None` for paths without a UTF-8 stem.
pub fn lower_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_ascii_lowercase())
}

/// Remove `path` if present; a missing file is not an error.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// File names directly inside `dir` (non-recursive), sorted.
pub fn list_file_names(dir: &Path) -> io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
