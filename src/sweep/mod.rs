//! Storage cleanup for scenario outputs.
//!
//! The sweeper removes every leaf object a scenario wrote below a namespace
//! prefix. Listings are one level deep ("current directory" semantics), so
//! the sweeper walks the tree itself: directory entries are listed in turn,
//! leaf entries are deleted. Directory entries are never deleted.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::service::{ObjectStore, StorageEntry};

/// Separator delimiting directory levels in object names.
pub const SEPARATOR: char = '/';

/// Default bound on directory levels walked below the prefix.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Summary of sweeper work.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepSummary {
    /// Number of leaf objects deleted.
    pub deleted_objects: usize,
    /// Number of directory listings performed, including the prefix itself.
    pub visited_directories: usize,
    /// Directory placeholder objects left in place.
    pub skipped_placeholders: usize,
}

/// Errors returned by the sweeper.
#[derive(Debug, Error)]
pub enum SweepError<StoreError>
where
    StoreError: std::error::Error + 'static,
{
    /// Raised when the bucket identifier is blank.
    #[error("missing bucket")]
    InvalidBucket,
    /// Raised before any remote call when the prefix is unsafe to sweep.
    #[error("refusing to sweep prefix '{prefix}': {reason}")]
    InvalidPrefix {
        /// Prefix supplied by the caller.
        prefix: String,
        /// Why the prefix was rejected.
        reason: String,
    },
    /// Raised when listing a directory fails.
    #[error("failed to list {bucket}/{prefix}: {source}")]
    List {
        /// Bucket being swept.
        bucket: String,
        /// Directory being listed.
        prefix: String,
        /// Provider-specific error.
        #[source]
        source: StoreError,
    },
    /// Raised when deleting a leaf fails; earlier deletions stand.
    #[error("failed to delete {bucket}/{name} after {deleted_before} deletions: {source}")]
    Delete {
        /// Bucket being swept.
        bucket: String,
        /// Object that could not be deleted.
        name: String,
        /// Objects already deleted when the failure happened.
        deleted_before: usize,
        /// Provider-specific error.
        #[source]
        source: StoreError,
    },
    /// Raised when the tree is deeper than the configured bound.
    #[error("directory {directory} exceeds the maximum sweep depth of {max_depth}")]
    DepthExceeded {
        /// Directory that was not walked.
        directory: String,
        /// Configured bound.
        max_depth: usize,
        /// Objects already deleted when the walk stopped.
        deleted_before: usize,
    },
}

/// Deletes leaf objects below a prefix using the provided store.
#[derive(Clone, Debug)]
pub struct Sweeper<S> {
    store: S,
    max_depth: usize,
}

impl<S> Sweeper<S>
where
    S: ObjectStore,
{
    /// Creates a sweeper with the default depth bound.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides how many directory levels below the prefix are walked.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Deletes every leaf object below `prefix` in `bucket`.
    ///
    /// The walk lists `prefix`, deletes its leaf entries, and lists each
    /// directory entry in turn until no directories remain. An empty prefix
    /// is a successful sweep with nothing deleted.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] when the prefix is unsafe, a listing or delete
    /// fails, or the tree is deeper than the configured bound. The sweep
    /// stops at the first failure; objects deleted before it stay deleted.
    pub async fn sweep(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<SweepSummary, SweepError<S::Error>> {
        validate(bucket, prefix)?;

        let mut summary = SweepSummary::default();
        let mut pending = VecDeque::from([(prefix.to_owned(), 0_usize)]);

        while let Some((directory, depth)) = pending.pop_front() {
            let entries = self
                .store
                .list(bucket, &directory)
                .await
                .map_err(|source| SweepError::List {
                    bucket: bucket.to_owned(),
                    prefix: directory.clone(),
                    source,
                })?;
            summary.visited_directories += 1;
            debug!(bucket, %directory, entries = entries.len(), "listed directory");

            for entry in entries {
                if entry.name == directory {
                    summary.skipped_placeholders += 1;
                    continue;
                }
                if !entry.name.starts_with(prefix) {
                    warn!(
                        bucket,
                        name = %entry.name,
                        prefix,
                        "listing returned entry outside prefix"
                    );
                    continue;
                }
                if entry.is_directory {
                    if depth >= self.max_depth {
                        return Err(SweepError::DepthExceeded {
                            directory: entry.name,
                            max_depth: self.max_depth,
                            deleted_before: summary.deleted_objects,
                        });
                    }
                    pending.push_back((entry.name, depth + 1));
                    continue;
                }
                self.delete(&entry, summary.deleted_objects).await?;
                summary.deleted_objects += 1;
            }
        }

        info!(
            bucket,
            prefix,
            deleted = summary.deleted_objects,
            directories = summary.visited_directories,
            "sweep complete"
        );
        Ok(summary)
    }

    async fn delete(
        &self,
        entry: &StorageEntry,
        deleted_before: usize,
    ) -> Result<(), SweepError<S::Error>> {
        debug!(bucket = %entry.bucket, name = %entry.name, "deleting object");
        self.store
            .delete(entry)
            .await
            .map_err(|source| SweepError::Delete {
                bucket: entry.bucket.clone(),
                name: entry.name.clone(),
                deleted_before,
                source,
            })
    }
}

fn validate<E>(bucket: &str, prefix: &str) -> Result<(), SweepError<E>>
where
    E: std::error::Error + 'static,
{
    if bucket.trim().is_empty() {
        return Err(SweepError::InvalidBucket);
    }
    match prefix_violation(prefix) {
        Some(reason) => Err(SweepError::InvalidPrefix {
            prefix: prefix.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}

/// Returns why `prefix` cannot be swept, or `None` when it names a
/// directory below the bucket root.
#[must_use]
pub fn prefix_violation(prefix: &str) -> Option<&'static str> {
    if prefix.trim_matches(SEPARATOR).trim().is_empty() {
        return Some("prefix must name a directory below the bucket root");
    }
    if !prefix.ends_with(SEPARATOR) {
        return Some("prefix must end with '/' to avoid matching sibling names");
    }
    None
}
