// SPDX-License-Identifier: GPL-3.0-or-later

//! Move identified files into one directory per artist.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tagscrub_domain::Item;
use tracing::{debug, info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const UNKNOWN_ARTIST_DIR: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub skipped_duplicates: usize,
    pub failed: usize,
}

/// ASCII-only directory name for an artist; `None` when nothing usable is left.
pub fn artist_directory_name(artist: &str) -> Option<String> {
    let folded: String = artist
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_ascii_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = folded.trim().trim_matches('.').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Directory an item belongs in: clean artist, then original artist, then [`UNKNOWN_ARTIST_DIR`].
pub fn target_directory(dest: &Path, item: &Item) -> PathBuf {
    let name = artist_directory_name(&item.clean.artist)
        .or_else(|| artist_directory_name(&item.original.artist))
        .unwrap_or_else(|| UNKNOWN_ARTIST_DIR.to_string());
    dest.join(name)
}

/// Move every non-duplicate item into `dest/<artist>/`, updating item paths.
///
/// Failures are logged per file and do not stop the run.
pub fn organize_items(items: &mut [Item], dest: &Path) -> OrganizeSummary {
    let mut summary = OrganizeSummary::default();

    for item in items.iter_mut() {
        if item.is_duplicate {
            debug!(target: "session", path = %item.path.display(), "skipping duplicate");
            summary.skipped_duplicates += 1;
            continue;
        }

        let directory = target_directory(dest, item);
        match move_into(&item.path, &directory) {
            Ok(new_path) => {
                debug!(
                    target: "session",
                    from = %item.path.display(),
                    to = %new_path.display(),
                    "moved file"
                );
                item.path = new_path;
                summary.moved += 1;
            }
            Err(err) => {
                warn!(
                    target: "session",
                    path = %item.path.display(),
                    directory = %directory.display(),
                    error = %err,
                    "failed to move file"
                );
                summary.failed += 1;
            }
        }
    }

    info!(
        target: "session",
        moved = summary.moved,
        skipped_duplicates = summary.skipped_duplicates,
        failed = summary.failed,
        "organize finished"
    );
    summary
}

fn move_into(source: &Path, directory: &Path) -> io::Result<PathBuf> {
    let file_name = source
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    fs::create_dir_all(directory)?;

    let target = directory.join(file_name);
    if target == source {
        return Ok(target);
    }
    if target.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }

    if fs::rename(source, &target).is_err() {
        // Renames fail across filesystems; fall back to copy and delete.
        fs::copy(source, &target)?;
        fs::remove_file(source)?;
    }
    Ok(target)
}
