//! Config sources and file discovery

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Where a configuration layer comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File { path: PathBuf, optional: bool },
    Bytes { label: String, data: Vec<u8> },
}

/// One configuration layer and the format used to decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub origin: Origin,
    pub format: String,
}

impl Source {
    /// Identifier used in reports and errors.
    pub fn label(&self) -> String {
        match &self.origin {
            Origin::File { path, .. } => path.display().to_string(),
            Origin::Bytes { label, .. } => label.clone(),
        }
    }

    /// Contents of the layer; `None` for a missing optional file.
    pub(crate) fn read(&self) -> Result<Option<Vec<u8>>> {
        match &self.origin {
            Origin::Bytes { data, .. } => Ok(Some(data.clone())),
            Origin::File { path, optional } => match fs::read(path) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if *optional && e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(source) => Err(Error::Io {
                    path: path.clone(),
                    source,
                }),
            },
        }
    }
}

/// Format of `path` derived from its extension, lower-cased.
pub(crate) fn format_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Search upward from `start_dir` for a file with the given name.
///
/// If `stop_at_git_root` is true, stops searching when a `.git` directory is found.
/// Returns `None` if the file is not found.
pub fn find_file_upward(start_dir: &Path, filename: &str, stop_at_git_root: bool) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let file_path = current.join(filename);
        if file_path.is_file() {
            return Some(file_path);
        }

        if stop_at_git_root && current.join(".git").exists() {
            return None;
        }

        if !current.pop() {
            return None;
        }
    }
}
