use anyhow::{bail, Result};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects the Rust source files of one or more source roots.
///
/// `target` and hidden directories are skipped. Files come back sorted by path so
/// that everything derived from them is independent of directory iteration order.
pub struct FileScanner {
    roots: Vec<PathBuf>,
}

/// Result of a scan
pub struct ScanResult {
    /// Every `.rs` file found, sorted
    pub rust_files: Vec<PathBuf>,
    /// Inaccessible entries that were skipped
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Walks every root; a root that does not exist is an error.
    pub fn scan(&self) -> Result<ScanResult> {
        let mut rust_files = Vec::new();
        let mut warnings = Vec::new();

        for root in &self.roots {
            if !root.exists() {
                bail!("Source root does not exist: {}", root.display());
            }

            if root.is_file() {
                if is_rust_file(root) {
                    rust_files.push(root.clone());
                }
                continue;
            }

            let walker = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.path() == root.as_path() || !is_ignored(e.file_name()));

            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_rust_file(entry.path()) => {
                        rust_files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let warning = format!("Failed to access path: {}", e);
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }
        }

        rust_files.sort();
        rust_files.dedup();

        Ok(ScanResult {
            rust_files,
            warnings,
        })
    }
}

fn is_ignored(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name == "target"
}

fn is_rust_file(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("rs")
}
