// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tagscrub_config::ScanConfig;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("path does not exist: {0}")]
    PathNotFound(String),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedAudioFile {
    pub path: PathBuf,
    pub extension: String,
    pub size_bytes: u64,
    /// Content window matches a file earlier in path order.
    pub is_duplicate: bool,
}

/// Recursively list audio files under `root`, sorted by path.
///
/// Symlinks are not followed. A file is flagged as a duplicate when the
/// `probe_len` bytes at `probe_offset` equal those of an earlier file; files
/// too short to reach the offset are never flagged.
pub fn scan_audio_files(root: impl AsRef<Path>, config: &ScanConfig) -> Result<Vec<ScannedAudioFile>, ScanError> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(ScanError::PathNotFound(root.display().to_string()));
    }

    let extensions: Vec<String> = config
        .extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut scanned = Vec::new();
    visit_directory(root, &extensions, &mut scanned)?;
    scanned.sort_by(|left, right| left.path.cmp(&right.path));

    mark_duplicates(&mut scanned, config);
    Ok(scanned)
}

/// A file whose probe window cannot be read stays a non-duplicate.
fn mark_duplicates(files: &mut [ScannedAudioFile], config: &ScanConfig) {
    let mut seen = DuplicateIndex::default();
    for file in files {
        let window = match read_probe_window(&file.path, config.probe_offset, config.probe_len) {
            Ok(window) => window,
            Err(err) => {
                warn!(target: "session", path = %file.path.display(), error = %err, "failed to read file for duplicate check");
                file.is_duplicate = false;
                continue;
            }
        };
        file.is_duplicate = seen.check_and_insert(window);
        if file.is_duplicate {
            debug!(target: "session", path = %file.path.display(), "duplicate audio content");
        }
    }
}

fn visit_directory(directory: &Path, extensions: &[String], scanned: &mut Vec<ScannedAudioFile>) -> Result<(), ScanError> {
    let entries = fs::read_dir(directory).map_err(|err| ScanError::io(directory, err))?;

    for entry in entries {
        let entry = entry.map_err(|err| ScanError::io(directory, err))?;
        let path = entry.path();

        let file_type = entry.file_type().map_err(|err| ScanError::io(&path, err))?;

        if file_type.is_symlink() {
            continue;
        }

        if file_type.is_dir() {
            visit_directory(&path, extensions, scanned)?;
            continue;
        }

        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };

        let normalized_extension = extension.to_ascii_lowercase();
        if !extensions.contains(&normalized_extension) {
            continue;
        }

        let metadata = fs::metadata(&path).map_err(|err| ScanError::io(&path, err))?;
        scanned.push(ScannedAudioFile {
            path,
            extension: normalized_extension,
            size_bytes: metadata.len(),
            is_duplicate: false,
        });
    }

    Ok(())
}

fn read_probe_window(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, ScanError> {
    let mut file = File::open(path).map_err(|err| ScanError::io(path, err))?;
    file.seek(SeekFrom::Start(offset)).map_err(|err| ScanError::io(path, err))?;

    let mut window = Vec::with_capacity(len);
    file.take(len as u64)
        .read_to_end(&mut window)
        .map_err(|err| ScanError::io(path, err))?;
    Ok(window)
}

/// Windows seen so far, bucketed by FNV-1a hash and compared byte for byte.
#[derive(Default)]
struct DuplicateIndex {
    buckets: HashMap<u64, Vec<Vec<u8>>>,
}

impl DuplicateIndex {
    fn check_and_insert(&mut self, window: Vec<u8>) -> bool {
        if window.is_empty() {
            return false;
        }

        let bucket = self.buckets.entry(fnv1a(&window)).or_default();
        if bucket.iter().any(|existing| *existing == window) {
            return true;
        }
        bucket.push(window);
        false
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
