//! Audio file discovery
//!
//! Resolves a file or directory into the sorted list of WAV files it contains.

use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Error, Result};

/// File extensions recognised as audio, compared case-insensitively
pub const AUDIO_EXTENSIONS: &[&str] = &["wav"];

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Find all audio files under `path`
///
/// A single file is returned on its own if it has an audio extension. A
/// directory is walked recursively. The returned paths are absolute and
/// sorted. Symbolic links are followed. A path that does not exist yields an
/// empty list.
pub fn find_audio_files<P: AsRef<Path>>(path: P) -> Vec<PathBuf> {
    let path = path.as_ref();
    let root = match fs::canonicalize(path) {
        Ok(root) => root,
        Err(e) => {
            warn!("Cannot resolve {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    if root.is_file() {
        return if is_audio_file(&root) { vec![root] } else { Vec::new() };
    }

    // Symlinked files and directories count like the files they point to.
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_audio_file(p))
        .collect();
    files.sort();
    files
}

/// List the immediate subdirectories of `root` as `(name, path)`, sorted by name
pub fn list_zone_dirs<P: AsRef<Path>>(root: P) -> Result<Vec<(String, PathBuf)>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::MissingDirectory(root.to_path_buf()));
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            warn!("Skipping non-directory entry {}", path.display());
            continue;
        }
        let name = entry.file_name().into_string().map_err(|name| {
            Error::InvalidInput(format!("Zone directory name is not UTF-8: {:?}", name))
        })?;
        dirs.push((name, path));
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}
