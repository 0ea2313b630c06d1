//! Input discovery.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use reelforge_common::error::{ReelError, ReelResult};
use reelforge_media_model::{is_supported_media, source_stem};

/// Resolve an input path to the media files it names.
///
/// A file must have a supported extension. A directory yields every
/// supported file directly inside it (non-recursive), sorted by path; an
/// empty result is not an error.
pub fn discover_inputs(input: &Path) -> ReelResult<Vec<PathBuf>> {
    if input.is_file() {
        if is_supported_media(input) {
            return Ok(vec![input.to_path_buf()]);
        }
        return Err(ReelError::unsupported(format!(
            "{} is not a supported audio or video file",
            input.display()
        )));
    }

    if !input.is_dir() {
        return Err(ReelError::source_unreadable(input, "input path does not exist"));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if path.is_file() && !hidden && is_supported_media(&path) {
            files.push(path);
        }
    }
    files.sort();

    tracing::info!(dir = %input.display(), count = files.len(), "Discovered input files");
    Ok(files)
}

/// Files whose output folder would collide with an earlier file's, paired
/// with the file that claimed the folder first.
pub fn stem_collisions(files: &[PathBuf]) -> Vec<(PathBuf, PathBuf)> {
    let mut owners: HashMap<String, &PathBuf> = HashMap::new();
    let mut collisions = Vec::new();
    for file in files {
        match owners.entry(source_stem(file)) {
            Entry::Occupied(owner) => collisions.push((file.clone(), (*owner.get()).clone())),
            Entry::Vacant(slot) => {
                slot.insert(file);
            }
        }
    }
    collisions
}
