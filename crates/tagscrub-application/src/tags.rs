// SPDX-License-Identifier: GPL-3.0-or-later

//! Reading and writing the four identification fields of audio file tags.

use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::Tag;
use tagscrub_domain::TagFields;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while accessing embedded tags
#[derive(Debug, Error)]
pub enum TagError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read tags from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },

    #[error("failed to write tags to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: LoftyError,
    },
}

pub trait TagStore: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagFields, TagError>;
    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), TagError>;
}

/// [`TagStore`] backed by `lofty`, covering ID3, Vorbis comments and MP4 atoms.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagStore;

impl TagStore for LoftyTagStore {
    fn read_tags(&self, path: &Path) -> Result<TagFields, TagError> {
        if !path.exists() {
            return Err(TagError::FileNotFound(path.to_path_buf()));
        }

        let tagged_file = read_from_path(path).map_err(|source| TagError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            debug!(target: "session", path = %path.display(), "file has no tags");
            return Ok(TagFields::default());
        };

        Ok(TagFields {
            artist: tag.artist().map(|value| value.trim().to_string()).unwrap_or_default(),
            album: tag.album().map(|value| value.trim().to_string()).unwrap_or_default(),
            title: tag.title().map(|value| value.trim().to_string()).unwrap_or_default(),
            number: tag.track(),
        })
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), TagError> {
        if !path.exists() {
            return Err(TagError::FileNotFound(path.to_path_buf()));
        }
        let write_error = |source: LoftyError| TagError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut tagged_file = read_from_path(path).map_err(|source| TagError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tag_type = tagged_file.primary_tag_type();
        if tagged_file.tag(tag_type).is_none() {
            tagged_file.insert_tag(Tag::new(tag_type));
        }

        if let Some(tag) = tagged_file.tag_mut(tag_type) {
            apply_fields(tag, fields);
        }

        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(write_error)?;
        debug!(target: "session", path = %path.display(), "tags written");
        Ok(())
    }
}

fn apply_fields(tag: &mut Tag, fields: &TagFields) {
    let artist = fields.artist.trim();
    if artist.is_empty() {
        tag.remove_artist();
    } else {
        tag.set_artist(artist.to_string());
    }

    let album = fields.album.trim();
    if album.is_empty() {
        tag.remove_album();
    } else {
        tag.set_album(album.to_string());
    }

    let title = fields.title.trim();
    if title.is_empty() {
        tag.remove_title();
    } else {
        tag.set_title(title.to_string());
    }

    match fields.number {
        Some(number) => tag.set_track(number),
        None => tag.remove_track(),
    }
}
