//! Enabling and disabling mods on disk.
//!
//! A mod with base filename `F` is either `F.jar` (enabled) or `F.jar.disabled` (disabled);
//! toggling is a single rename. The [`Activator`] trait is the seam the search service talks
//! through, so tests can swap the filesystem out for a recording double.

use crate::mods::set::ModSet;
use crate::mods::{ModCatalog, ModId};
use crate::state::StatusMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// One reversible rename performed while materializing an effective set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub mod_id: ModId,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
    /// Whether the rename enabled the mod (as opposed to disabling it).
    pub activate: bool,
}

#[derive(Debug, Error)]
pub enum ActivateError {
    /// Mods whose jar is gone in both spellings while a toggle was required. Non-fatal: the
    /// caller reclassifies them as missing and retries.
    #[error("{} mod file(s) are missing on disk", .0.len())]
    MissingFiles(Vec<(ModId, PathBuf)>),

    /// A rename failed. Anything applied before the failure has already been rolled back.
    #[error("could not rename '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Side-effectful application of an effective set. `apply` must be reversible through `revert`.
pub trait Activator {
    /// Bring the mods directory in line with `effective`: everything in the set enabled,
    /// everything else disabled. Returns the renames performed, for later reversal. Performs
    /// no renames at all when any required file is missing.
    fn apply(&self, effective: &ModSet, statuses: &StatusMap) -> Result<Vec<FileChange>, ActivateError>;

    /// Undo `apply`, newest rename first, attempting every change even if one fails.
    fn revert(&self, changes: &[FileChange]) -> Result<(), ActivateError>;

    /// Enable every mod that still has a file on disk. Used when a session ends.
    fn enable_all(&self, statuses: &StatusMap) -> Result<Vec<FileChange>, ActivateError>;
}

/// The real activator, renaming files under the mods directory.
pub struct FsActivator {
    mods_dir: PathBuf,
    catalog: Arc<ModCatalog>,
}

impl FsActivator {
    pub fn new(mods_dir: PathBuf, catalog: Arc<ModCatalog>) -> Self {
        Self { mods_dir, catalog }
    }

    fn enabled_path(&self, base_filename: &str) -> PathBuf {
        self.mods_dir.join(format!("{base_filename}.jar"))
    }

    fn disabled_path(&self, base_filename: &str) -> PathBuf {
        self.mods_dir.join(format!("{base_filename}.jar.disabled"))
    }

    /// Compute the renames needed to reach the desired enablement, without touching disk.
    /// Mods already flagged missing are skipped quietly; a newly vanished file is an error.
    fn plan_changes(
        &self,
        desired_enabled: impl Fn(&ModId) -> bool,
        statuses: &StatusMap,
    ) -> Result<Vec<FileChange>, ActivateError> {
        let mut changes = Vec::new();
        let mut missing = Vec::new();

        for metadata in self.catalog.mods() {
            if statuses.get(&metadata.id).is_some_and(|status| status.missing) {
                continue;
            }

            let enabled_path = self.enabled_path(&metadata.base_filename);
            let disabled_path = self.disabled_path(&metadata.base_filename);
            let currently_enabled = enabled_path.exists();

            let desired = desired_enabled(&metadata.id);
            if desired == currently_enabled && (currently_enabled || disabled_path.exists()) {
                continue;
            }

            let (old_path, new_path) = if desired {
                (disabled_path, enabled_path)
            } else {
                (enabled_path, disabled_path)
            };

            if !old_path.exists() {
                missing.push((metadata.id.clone(), old_path));
                continue;
            }

            changes.push(FileChange {
                mod_id: metadata.id.clone(),
                old_path,
                new_path,
                activate: desired,
            });
        }

        if missing.is_empty() { Ok(changes) } else { Err(ActivateError::MissingFiles(missing)) }
    }

    /// Perform the renames. On the first failure everything already renamed is rolled back
    /// before the error is returned.
    fn apply_changes(&self, changes: Vec<FileChange>) -> Result<Vec<FileChange>, ActivateError> {
        for (index, change) in changes.iter().enumerate() {
            log::trace!(
                "{} '{}'",
                if change.activate { "Enabling" } else { "Disabling" },
                change.mod_id
            );

            if let Err(source) = std::fs::rename(&change.old_path, &change.new_path) {
                log::error!("Could not rename '{}', rolling back", change.old_path.display());
                let _ = self.revert(&changes[..index]);
                return Err(ActivateError::Io {
                    path: change.old_path.clone(),
                    source,
                });
            }
        }

        Ok(changes)
    }
}

impl Activator for FsActivator {
    fn apply(&self, effective: &ModSet, statuses: &StatusMap) -> Result<Vec<FileChange>, ActivateError> {
        let changes = self.plan_changes(|id| effective.contains(id), statuses)?;
        log::debug!("Applying {} file change(s)", changes.len());
        self.apply_changes(changes)
    }

    fn revert(&self, changes: &[FileChange]) -> Result<(), ActivateError> {
        let mut failure = None;

        for change in changes.iter().rev() {
            if let Err(source) = std::fs::rename(&change.new_path, &change.old_path) {
                log::warn!("Could not restore '{}': {}", change.old_path.display(), source);
                failure.get_or_insert(ActivateError::Io {
                    path: change.new_path.clone(),
                    source,
                });
            }
        }

        match failure {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    fn enable_all(&self, statuses: &StatusMap) -> Result<Vec<FileChange>, ActivateError> {
        let changes = self.plan_changes(|_| true, statuses)?;
        log::debug!("Re-enabling {} mod(s)", changes.len());
        self.apply_changes(changes)
    }
}
