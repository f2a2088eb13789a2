// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::{FingerprintError, Result};

/// Compressed Chromaprint fingerprint as printed by `fpcalc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    /// Base64 text; `fpcalc` emits the URL-safe alphabet without padding.
    pub hash: String,
    /// Whole seconds of audio in the file.
    pub duration: u32,
}

/// Raw `fpcalc -json` output.
#[derive(Debug, Deserialize)]
struct FpcalcOutput {
    duration: f64,
    fingerprint: String,
}

impl Fingerprint {
    pub fn new(hash: impl Into<String>, duration: u32) -> Self {
        Self {
            hash: hash.into(),
            duration,
        }
    }

    /// Parse the JSON document written by `fpcalc -json`.
    pub fn from_fpcalc_json(output: &str) -> Result<Self> {
        let parsed: FpcalcOutput = serde_json::from_str(output.trim())?;
        if !parsed.duration.is_finite() || parsed.duration < 0.0 {
            return Err(FingerprintError::InvalidFingerprint(format!(
                "invalid duration {}",
                parsed.duration
            )));
        }

        let fingerprint = Self::new(parsed.fingerprint, parsed.duration.round() as u32);
        fingerprint.validate()?;
        Ok(fingerprint)
    }

    /// Reject empty or non-base64 hashes and zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.hash.is_empty() {
            return Err(FingerprintError::InvalidFingerprint(
                "fingerprint hash is empty".to_string(),
            ));
        }

        if self.duration == 0 {
            return Err(FingerprintError::InvalidFingerprint(
                "duration must be > 0".to_string(),
            ));
        }

        let trimmed = self.hash.trim_end_matches('=');
        if self.hash.len() - trimmed.len() > 2 {
            return Err(FingerprintError::InvalidFingerprint(
                "invalid base64 padding: too many '=' characters".to_string(),
            ));
        }

        // Both the standard and the URL-safe alphabets are accepted.
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_'))
        {
            return Err(FingerprintError::InvalidFingerprint(
                "fingerprint contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}
