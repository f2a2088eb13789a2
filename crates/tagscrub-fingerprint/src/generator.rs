// SPDX-License-Identifier: GPL-3.0-or-later

//! Fingerprint generation by running Chromaprint's `fpcalc` tool.
//!
//! # Example
//!
//! ```no_run
//! use tagscrub_fingerprint::FingerprintGenerator;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = FingerprintGenerator::new("fpcalc");
//! let fingerprint = generator.generate(Path::new("song.mp3")).await?;
//! println!("fingerprinted {}s of audio", fingerprint.duration);
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, instrument};

use crate::{Fingerprint, FingerprintError, Result};

/// Seconds of audio analysed; Chromaprint's standard window.
const FINGERPRINT_LENGTH_SECS: u32 = 120;

#[derive(Debug, Clone)]
pub struct FingerprintGenerator {
    fpcalc_path: PathBuf,
    length_secs: u32,
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new("fpcalc")
    }
}

impl FingerprintGenerator {
    pub fn new(fpcalc_path: impl Into<PathBuf>) -> Self {
        Self {
            fpcalc_path: fpcalc_path.into(),
            length_secs: FINGERPRINT_LENGTH_SECS,
        }
    }

    pub fn with_length(mut self, length_secs: u32) -> Self {
        self.length_secs = length_secs.max(1);
        self
    }

    /// Fingerprint one audio file.
    ///
    /// # Errors
    ///
    /// - `FpcalcNotFound` when the tool cannot be started
    /// - `AudioProcessing` when the tool exits with a failure status
    /// - `InvalidFingerprint` / `SerializationError` when its output cannot be used
    #[instrument(skip(self), fields(file = %path.display()))]
    pub async fn generate(&self, path: &Path) -> Result<Fingerprint> {
        if !path.is_file() {
            return Err(FingerprintError::AudioProcessing(format!(
                "not a file: {}",
                path.display()
            )));
        }

        let output = Command::new(&self.fpcalc_path)
            .arg("-json")
            .arg("-length")
            .arg(self.length_secs.to_string())
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => {
                    FingerprintError::FpcalcNotFound(self.fpcalc_path.display().to_string())
                }
                _ => FingerprintError::AudioProcessing(format!("failed to run fpcalc: {err}")),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FingerprintError::AudioProcessing(format!(
                "fpcalc exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let fingerprint = Fingerprint::from_fpcalc_json(&stdout)?;
        debug!(target: "fingerprint", duration = fingerprint.duration, "fingerprint generated");
        Ok(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_rejected_before_spawning() {
        let generator = FingerprintGenerator::new("fpcalc");
        let result = generator.generate(Path::new("/definitely/not/here.mp3")).await;

        assert!(matches!(result, Err(FingerprintError::AudioProcessing(_))));
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        std::fs::write(&file, b"not really audio").unwrap();

        let generator = FingerprintGenerator::new(dir.path().join("no-such-fpcalc"));
        let result = generator.generate(&file).await;

        assert!(matches!(result, Err(FingerprintError::FpcalcNotFound(_))));
    }
}
