// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tagscrub_config::ScanConfig;
use tagscrub_domain::{Item, QueryResult, TagFields};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::document::{export_items, import_items, DocumentError, ImportMode};
use crate::events::ProgressSink;
use crate::organize::{organize_items, OrganizeSummary};
use crate::pipeline::{IdentificationPipeline, PipelineError, PipelineSummary};
use crate::scan::{scan_audio_files, ScanError};
use crate::tags::TagStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("background task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub written: usize,
    /// Items whose result is not `FieldsChanged`.
    pub skipped: usize,
    pub missing: usize,
    pub failed: usize,
}

/// The working set of items and the operations over it.
///
/// Every operation holds the item lock for its whole duration, so
/// operations on one session never interleave.
#[derive(Clone)]
pub struct ScrubSession {
    items: Arc<Mutex<Vec<Item>>>,
    tags: Arc<dyn TagStore>,
    scan: ScanConfig,
}

impl ScrubSession {
    pub fn new(tags: Arc<dyn TagStore>, scan: ScanConfig) -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
            tags,
            scan,
        }
    }

    pub async fn snapshot(&self) -> Vec<Item> {
        self.items.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replace the working set with the audio files under `root`.
    ///
    /// With `only_artist`, keep files whose artist tag contains it, ignoring
    /// case and whitespace. Unreadable tags give an item with empty fields.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn find(&self, root: &Path, only_artist: Option<&str>) -> Result<usize, SessionError> {
        let mut items = self.items.lock().await;

        let root = root.to_path_buf();
        let scan = self.scan.clone();
        let tags = Arc::clone(&self.tags);
        let filter = only_artist.map(squash).filter(|f| !f.is_empty());

        let found = tokio::task::spawn_blocking(move || find_items(&root, &scan, tags.as_ref(), filter.as_deref()))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))??;

        info!(target: "session", items = found.len(), "found audio files");
        *items = found;
        Ok(items.len())
    }

    pub async fn identify(
        &self,
        pipeline: &IdentificationPipeline,
        progress: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PipelineSummary, SessionError> {
        let mut items = self.items.lock().await;
        Ok(pipeline.run(&mut items, progress, cancel).await?)
    }

    /// Write clean tags to every existing file whose result is `FieldsChanged`.
    #[instrument(skip(self))]
    pub async fn write(&self) -> Result<WriteSummary, SessionError> {
        let items = self.items.lock().await;
        let candidates: Vec<(PathBuf, Option<TagFields>)> = items
            .iter()
            .map(|item| {
                let fields = (item.result == QueryResult::FieldsChanged).then(|| item.clean.clone());
                (item.path.clone(), fields)
            })
            .collect();
        let tags = Arc::clone(&self.tags);

        let summary = tokio::task::spawn_blocking(move || write_items(&candidates, tags.as_ref()))
            .await
            .map_err(|err| SessionError::Task(err.to_string()))?;

        info!(
            target: "session",
            written = summary.written,
            skipped = summary.skipped,
            missing = summary.missing,
            failed = summary.failed,
            "tag write finished"
        );
        Ok(summary)
    }

    pub async fn export(&self, path: &Path) -> Result<(), SessionError> {
        let items = self.items.lock().await;
        export_items(&items, path)?;
        Ok(())
    }

    /// Replace the working set with the items of an exported document.
    pub async fn import(&self, path: &Path, mode: ImportMode) -> Result<usize, SessionError> {
        let mut items = self.items.lock().await;
        *items = import_items(path, mode)?;
        Ok(items.len())
    }

    pub async fn organize(&self, dest: &Path) -> OrganizeSummary {
        let mut items = self.items.lock().await;
        organize_items(&mut items, dest)
    }
}

/// Lower-cased with all whitespace removed.
fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_items(
    root: &Path,
    scan: &ScanConfig,
    tags: &dyn TagStore,
    only_artist: Option<&str>,
) -> Result<Vec<Item>, ScanError> {
    let mut items = Vec::new();

    for file in scan_audio_files(root, scan)? {
        let original = match tags.read_tags(&file.path) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(target: "session", path = %file.path.display(), error = %err, "failed to read tags");
                TagFields::default()
            }
        };

        if let Some(wanted) = only_artist {
            if !squash(&original.artist).contains(wanted) {
                continue;
            }
        }

        items.push(Item::new(file.path, original).with_duplicate(file.is_duplicate));
    }

    Ok(items)
}

fn write_items(candidates: &[(PathBuf, Option<TagFields>)], tags: &dyn TagStore) -> WriteSummary {
    let mut summary = WriteSummary::default();

    for (path, fields) in candidates {
        let Some(fields) = fields else {
            debug!(target: "session", path = %path.display(), "nothing to write");
            summary.skipped += 1;
            continue;
        };

        if !path.exists() {
            warn!(target: "session", path = %path.display(), "file no longer exists");
            summary.missing += 1;
            continue;
        }

        match tags.write_tags(path, fields) {
            Ok(()) => summary.written += 1,
            Err(err) => {
                warn!(target: "session", path = %path.display(), error = %err, "failed to write tags");
                summary.failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squash_ignores_case_and_spacing() {
        assert_eq!(squash(" Black  Sabbath "), "blacksabbath");
        assert_eq!(squash("ÉLAN"), "élan");
    }
}
