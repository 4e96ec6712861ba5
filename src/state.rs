//! Runtime status flags for every mod in the collection.
//!
//! The [`StateManager`] is the only shared-mutable piece of the tool: the UI flips user-facing
//! flags on it while the search service derives its candidate pool from snapshots of it. Reads
//! are concurrent, writes are exclusive, and a batch write is one observable change.

use crate::mods::set::ModSet;
use crate::mods::{ModCatalog, ModId};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-mod runtime flags. All default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModStatus {
    /// Always part of the effective set. Mutually exclusive with `force_disabled`.
    pub force_enabled: bool,
    /// Never activated, not even as a dependency. Mutually exclusive with `force_enabled`.
    pub force_disabled: bool,
    /// Excluded from the search pool but still activatable as a dependency.
    pub omitted: bool,
    /// The jar is gone from disk.
    pub missing: bool,
    /// Cannot be resolved with the currently activatable collection.
    pub unresolvable: bool,
    /// Already identified as part of a conflict set in a previous round.
    pub problematic: bool,
}

/// A point-in-time copy of every mod's status, keyed by ID in lexicographic order.
pub type StatusMap = BTreeMap<ModId, ModStatus>;

type ChangeCallback = Box<dyn Fn() + Send + Sync>;

/// Thread-safe store of [`ModStatus`] flags over an immutable catalog.
pub struct StateManager {
    catalog: Arc<ModCatalog>,
    statuses: RwLock<StatusMap>,
    on_change: Mutex<Option<ChangeCallback>>,
}

impl ModStatus {
    /// Whether the mod may appear in an effective set at all.
    pub fn is_activatable(&self) -> bool {
        !self.force_disabled && !self.missing
    }

    /// Whether the mod belongs in the bisection search pool.
    pub fn is_search_candidate(&self) -> bool {
        !self.force_enabled
            && !self.force_disabled
            && !self.omitted
            && !self.missing
            && !self.unresolvable
            && !self.problematic
    }
}

impl StateManager {
    /// Create the store with a status entry per catalog mod, seeding the `missing` flag from the
    /// loader's scan.
    pub fn new(catalog: Arc<ModCatalog>, missing: &ModSet) -> Self {
        let statuses = catalog
            .ids()
            .iter()
            .map(|id| {
                let status = ModStatus {
                    missing: missing.contains(id),
                    ..ModStatus::default()
                };
                (id.clone(), status)
            })
            .collect();

        Self {
            catalog,
            statuses: RwLock::new(statuses),
            on_change: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> &Arc<ModCatalog> {
        &self.catalog
    }

    /// Register the single change callback. It fires synchronously, once per mutating call (a
    /// batch counts as one mutation), and only when at least one flag actually changed.
    pub fn set_on_state_changed(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_change.lock() = Some(Box::new(callback));
    }

    /// An owned copy of all statuses.
    pub fn snapshot(&self) -> StatusMap {
        self.statuses.read().clone()
    }

    pub fn status(&self, id: &str) -> Option<ModStatus> {
        self.statuses.read().get(id).copied()
    }

    pub fn set_force_enabled(&self, id: &str, value: bool) {
        self.mutate(|statuses| {
            update(statuses, id, |status| {
                status.force_enabled = value;
                if value {
                    status.force_disabled = false;
                }
            })
        });
    }

    pub fn set_force_disabled(&self, id: &str, value: bool) {
        self.mutate(|statuses| {
            update(statuses, id, |status| {
                status.force_disabled = value;
                if value {
                    status.force_enabled = false;
                }
            })
        });
    }

    pub fn set_omitted(&self, id: &str, value: bool) {
        self.mutate(|statuses| update(statuses, id, |status| status.omitted = value));
    }

    pub fn set_missing(&self, id: &str, value: bool) {
        self.mutate(|statuses| update(statuses, id, |status| status.missing = value));
    }

    pub fn set_force_disabled_batch(&self, ids: &ModSet, value: bool) {
        self.mutate(|statuses| {
            batch(statuses, ids, |status| {
                status.force_disabled = value;
                if value {
                    status.force_enabled = false;
                }
            })
        });
    }

    pub fn set_missing_batch(&self, ids: &ModSet, value: bool) {
        self.mutate(|statuses| batch(statuses, ids, |status| status.missing = value));
    }

    pub fn set_unresolvable_batch(&self, ids: &ModSet, value: bool) {
        self.mutate(|statuses| batch(statuses, ids, |status| status.unresolvable = value));
    }

    pub fn set_problematic_batch(&self, ids: &ModSet, value: bool) {
        self.mutate(|statuses| batch(statuses, ids, |status| status.problematic = value));
    }

    /// Clear the cross-round flags on every mod. Used when the whole search starts over.
    pub fn clear_search_flags(&self) {
        self.mutate(|statuses| {
            let mut changed = false;
            for status in statuses.values_mut() {
                changed |= status.unresolvable || status.problematic;
                status.unresolvable = false;
                status.problematic = false;
            }
            changed
        });
    }

    /// IDs that may appear in an effective set.
    pub fn activatable_set(&self) -> ModSet {
        self.collect(|status| status.is_activatable())
    }

    /// IDs eligible for the bisection search pool.
    pub fn search_candidate_set(&self) -> ModSet {
        self.collect(|status| status.is_search_candidate())
    }

    /// IDs currently flagged unresolvable.
    pub fn unresolvable_set(&self) -> ModSet {
        self.collect(|status| status.unresolvable)
    }

    fn collect(&self, predicate: impl Fn(&ModStatus) -> bool) -> ModSet {
        self.statuses
            .read()
            .iter()
            .filter(|(_, status)| predicate(status))
            .map(|(id, _)| id)
            .collect()
    }

    fn mutate(&self, write: impl FnOnce(&mut StatusMap) -> bool) {
        let changed = {
            let mut statuses = self.statuses.write();
            write(&mut statuses)
        };

        if changed && let Some(callback) = self.on_change.lock().as_ref() {
            callback();
        }
    }
}

fn update(statuses: &mut StatusMap, id: &str, apply: impl FnOnce(&mut ModStatus)) -> bool {
    let Some(status) = statuses.get_mut(id) else {
        return false;
    };

    let before = *status;
    apply(status);
    *status != before
}

fn batch(statuses: &mut StatusMap, ids: &ModSet, apply: impl Fn(&mut ModStatus)) -> bool {
    let mut changed = false;
    for id in ids.iter() {
        changed |= update(statuses, id, &apply);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn manager(ids: &[&str]) -> StateManager {
        let mods = ids
            .iter()
            .map(|id| crate::mods::ModMetadata {
                id: id.to_string(),
                version: crate::mods::version::Version::parse("1.0.0"),
                depends: BTreeMap::new(),
                breaks: BTreeMap::new(),
                provides: ModSet::new(),
                embedded: Vec::new(),
                base_filename: id.to_string(),
                initially_active: true,
            })
            .collect();

        StateManager::new(Arc::new(ModCatalog::new(mods)), &ModSet::new())
    }

    fn count_changes(manager: &StateManager) -> Arc<AtomicUsize> {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook = counter.clone();
        manager.set_on_state_changed(move || {
            hook.fetch_add(1, Ordering::SeqCst);
        });
        counter
    }

    #[test]
    fn force_flags_are_mutually_exclusive() {
        let manager = manager(&["a"]);

        manager.set_force_disabled("a", true);
        manager.set_force_enabled("a", true);
        let status = manager.status("a").unwrap();
        assert!(status.force_enabled);
        assert!(!status.force_disabled);

        manager.set_force_disabled("a", true);
        let status = manager.status("a").unwrap();
        assert!(!status.force_enabled);
        assert!(status.force_disabled);
    }

    #[test]
    fn noop_writes_do_not_notify() {
        let manager = manager(&["a"]);
        let changes = count_changes(&manager);

        manager.set_omitted("a", false);
        manager.set_force_enabled("a", false);
        assert_eq!(changes.load(Ordering::SeqCst), 0);

        manager.set_omitted("a", true);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
        manager.set_omitted("a", true);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn batch_notifies_once() {
        let manager = manager(&["a", "b", "c"]);
        let changes = count_changes(&manager);

        let ids: ModSet = ["a", "b", "c"].iter().map(|id| id.to_string()).collect();
        manager.set_problematic_batch(&ids, true);
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        // Setting the same flags again changes nothing and stays silent.
        manager.set_problematic_batch(&ids, true);
        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let manager = manager(&["a"]);
        let changes = count_changes(&manager);

        manager.set_missing("nope", true);
        assert_eq!(changes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshot_is_an_owned_copy() {
        let manager = manager(&["a"]);
        let snapshot = manager.snapshot();

        manager.set_omitted("a", true);
        assert!(!snapshot["a"].omitted);
        assert!(manager.status("a").unwrap().omitted);
    }

    #[test]
    fn derived_sets_follow_the_flags() {
        let manager = manager(&["a", "b", "c"]);

        manager.set_force_enabled("a", true);
        manager.set_force_disabled("b", true);

        assert_eq!(manager.search_candidate_set().to_sorted_vec(), ["c"]);
        let activatable = manager.activatable_set();
        assert!(activatable.contains("a"));
        assert!(!activatable.contains("b"));
        assert!(activatable.contains("c"));
    }
}
