// SPDX-License-Identifier: GPL-3.0-or-later

//! Acoustic fingerprint identification for music files.
//!
//! This crate provides functionality for:
//! - Generating Chromaprint fingerprints with the `fpcalc` tool
//! - Looking fingerprints up on AcoustID with recording, release and track metadata
//! - Reducing the best match to artist, album, title and track number

pub mod acoustid;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod identifier;

pub use acoustid::{AcoustidClient, AcoustidClientBuilder, RecordingMatch};
pub use error::{FingerprintError, Result};
pub use fingerprint::Fingerprint;
pub use generator::FingerprintGenerator;
pub use identifier::{AcoustidIdentifier, IdentifiedTrack};
