use crate::config::has_text_extension;
use crate::model::Item;
use dashmap::DashMap;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Which files get their contents loaded as text for near-duplicate analysis.
#[derive(Debug, Clone)]
pub struct TextPolicy {
    pub extensions: Vec<String>,
    pub max_bytes: u64,
}

/// Parallel directory traversal producing engine items.
///
/// Skips symlinks, 0-byte files and anything matching an ignore glob. Items
/// are numbered in path order so repeated walks of an unchanged tree yield
/// identical input for the order-sensitive clustering step.
pub fn build_items(
    root_paths: &[PathBuf],
    ignore_globs: &[String],
    text: &TextPolicy,
) -> io::Result<Vec<Item>> {
    let found: DashMap<PathBuf, u64> = DashMap::new();

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    root_paths
        .par_iter()
        .try_for_each(|root_dir| visit_dirs(root_dir, &found, &ignore_patterns))?;

    let mut paths: Vec<(PathBuf, u64)> = found.into_iter().collect();
    paths.sort();
    debug!("Walk found {} files", paths.len());

    let items = paths
        .into_par_iter()
        .enumerate()
        .map(|(idx, (path, size))| {
            let contents = load_text(&path, size, text);
            let mut item = Item::new(idx as i64 + 1, path, size);
            item.text = contents;
            item
        })
        .collect();
    Ok(items)
}

fn load_text(path: &Path, size: u64, policy: &TextPolicy) -> Option<String> {
    if size > policy.max_bytes || !has_text_extension(path, &policy.extensions) {
        return None;
    }
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!("Could not read text of {}: {}", path.display(), e);
            None
        }
    }
}

fn visit_dirs(dir: &Path, found: &DashMap<PathBuf, u64>, ignore_patterns: &[Pattern]) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if ignore_patterns.iter().any(|pattern| pattern.matches_path(dir)) {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            error!("Access denied reading directory {}: {}", dir.display(), err);
            return Ok(());
        }
        Err(err) => {
            return Err(io::Error::new(
                err.kind(),
                format!("Error reading directory {}: {}", dir.display(), err),
            ));
        }
    };

    entries.par_bridge().try_for_each(|entry_result| -> io::Result<()> {
        let entry = entry_result.map_err(|err| {
            io::Error::new(
                err.kind(),
                format!("Error reading entry in directory {}: {}", dir.display(), err),
            )
        })?;

        let path = entry.path();
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Error getting metadata for {}: {}", path.display(), err);
                return Ok(());
            }
        };

        if metadata.file_type().is_symlink() {
            return Ok(());
        }
        if metadata.is_dir() {
            visit_dirs(&path, found, ignore_patterns)?;
        } else if metadata.len() > 0
            && !ignore_patterns.iter().any(|pattern| pattern.matches_path(&path))
        {
            found.insert(path, metadata.len());
        }
        Ok(())
    })?;

    Ok(())
}
