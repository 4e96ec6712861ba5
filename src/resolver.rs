//! Dependency resolution over the immutable catalog.
//!
//! Given a target set of mods, [`Resolver::resolve_effective_set`] picks a concrete,
//! version-consistent set of mods to enable, searching depth-first over capability providers and
//! backtracking when a tentative choice cannot be completed. Every call runs in a private
//! session, so a resolver shared between threads never needs locking.

use crate::mods::set::ModSet;
use crate::mods::version::{Version, VersionReq};
use crate::mods::{ModCatalog, ModId, ProviderInfo, is_implicit};
use crate::state::StatusMap;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Why a resolution failed. None of these are fatal to the process; the whole resolution is
/// abandoned and reported.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// A capability is already pinned to a provider that a later requirement rejects.
    #[error(
        "dependency conflict on '{dep_id}': '{requiring_mod}' needs {requirement}, \
         but '{provider}' was already chosen at {provider_version}"
    )]
    DependencyConflict {
        dep_id: ModId,
        requiring_mod: ModId,
        provider: ModId,
        provider_version: Version,
        requirement: VersionReq,
    },

    /// A mod was reached again while its own dependencies were still being resolved.
    #[error("circular dependency involving '{mod_id}'")]
    CircularDependency { mod_id: ModId },

    /// A mod in the effective set declares that it breaks a capability another member provides.
    #[error("'{broken_by}' breaks '{broken_id}' {requirement} (provided at {provider_version})")]
    BreaksViolation {
        broken_by: ModId,
        broken_id: ModId,
        provider_version: Version,
        requirement: VersionReq,
    },

    /// No provider chain satisfies a dependency.
    #[error("no usable provider for '{dep_id}' required by '{requiring_mod}'")]
    UnsatisfiedDependency { dep_id: ModId, requiring_mod: ModId },

    /// A target or forced mod is missing from disk or force-disabled.
    #[error("'{mod_id}' cannot be activated")]
    TargetNotActivatable { mod_id: ModId },

    /// A target named a mod the catalog does not contain.
    #[error("unknown mod '{mod_id}'")]
    UnknownMod { mod_id: ModId },
}

/// Why a mod ended up in the effective set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationReason {
    /// Directly part of the requested target set.
    Target,
    /// Force-enabled by the user.
    Forced,
    /// Pulled in to satisfy another mod's dependency.
    Dependency,
}

/// How a single mod's activation was justified.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolutionInfo {
    pub reason: ActivationReason,
    /// The mods (or `(root)`) that requested this activation.
    pub needed_for: Vec<ModId>,
    /// The capability this activation satisfied.
    pub satisfied_dep: ModId,
    /// The provider record that won, when the mod was chosen via a capability lookup.
    pub provider: Option<ProviderInfo>,
}

/// A successful resolution: the mods to enable plus the justification for each.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Resolution {
    pub effective_set: ModSet,
    pub path: BTreeMap<ModId, ResolutionInfo>,
}

/// Stateless entry point; every call opens a fresh session over the shared catalog.
#[derive(Clone)]
pub struct Resolver {
    catalog: Arc<ModCatalog>,
}

/// The requester name recorded for target and forced activations.
const ROOT: &str = "(root)";

impl Resolver {
    pub fn new(catalog: Arc<ModCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve the mods that must be enabled to activate `target` plus every force-enabled mod
    /// in `statuses`, without ever activating a force-disabled or missing mod.
    pub fn resolve_effective_set(&self, target: &ModSet, statuses: &StatusMap) -> Result<Resolution, ResolveError> {
        let mut session = Session {
            catalog: &self.catalog,
            statuses,
            effective: ModSet::new(),
            stack: Vec::new(),
            on_stack: FxHashSet::default(),
            chosen: FxHashMap::default(),
            unresolvable: FxHashSet::default(),
            path: BTreeMap::new(),
        };

        let forced: ModSet = statuses
            .iter()
            .filter(|(_, status)| status.force_enabled)
            .map(|(id, _)| id)
            .collect();

        for id in target.union(&forced).to_sorted_vec() {
            let reason = if target.contains(&id) {
                ActivationReason::Target
            } else {
                ActivationReason::Forced
            };

            session
                .ensure_active(&id, ROOT, reason, &id, None)
                .map_err(|failure| failure.into_root_error(&id))?;
        }

        session.validate_breaks()?;

        Ok(Resolution {
            effective_set: session.effective,
            path: session.path,
        })
    }

    /// Mods in `available` with at least one dependency that no member of `available` can
    /// satisfy at a compatible version. One pass over `depends`; no transitive reasoning, no
    /// backtracking, and `breaks` is not consulted.
    pub fn directly_unresolvable(&self, available: &ModSet) -> ModSet {
        available
            .iter()
            .filter(|id| {
                let Some(metadata) = self.catalog.get(id) else {
                    return false;
                };

                metadata.depends.iter().any(|(dep_id, requirements)| {
                    !is_implicit(dep_id) && !self.has_available_provider(dep_id, requirements, available)
                })
            })
            .collect()
    }

    /// The fixpoint of the direct check: each pass removes the newly unresolvable mods from the
    /// available set until a pass finds none.
    pub fn transitively_unresolvable(&self, initial: &ModSet) -> ModSet {
        let mut available = initial.clone();
        let mut unresolvable = ModSet::new();

        loop {
            let found = self.directly_unresolvable(&available);
            if found.is_empty() {
                return unresolvable;
            }

            available = available.subtract(&found);
            unresolvable = unresolvable.union(&found);
        }
    }

    fn has_available_provider(&self, dep_id: &str, requirements: &[VersionReq], available: &ModSet) -> bool {
        self.catalog.providers_of(dep_id).iter().any(|provider| {
            available.contains(&provider.mod_id)
                && requirements.iter().all(|req| req.matches(&provider.provided_version))
        })
    }
}

/// A non-fatal failure lets the caller try the next provider; a fatal one abandons the whole
/// resolution.
enum Failure {
    Fatal(ResolveError),
    NotActivatable(ModId),
    Unknown(ModId),
    Unsatisfied { dep_id: ModId, requiring_mod: ModId },
}

impl Failure {
    fn into_root_error(self, target: &str) -> ResolveError {
        match self {
            Failure::Fatal(error) => error,
            Failure::NotActivatable(mod_id) => ResolveError::TargetNotActivatable { mod_id },
            Failure::Unknown(_) => ResolveError::UnknownMod {
                mod_id: target.to_string(),
            },
            Failure::Unsatisfied { dep_id, requiring_mod } => {
                ResolveError::UnsatisfiedDependency { dep_id, requiring_mod }
            }
        }
    }
}

/// Per-call working state. Short-lived, never shared.
struct Session<'a> {
    catalog: &'a ModCatalog,
    statuses: &'a StatusMap,
    effective: ModSet,
    stack: Vec<ModId>,
    on_stack: FxHashSet<ModId>,
    /// The provider pinned for each capability resolved so far.
    chosen: FxHashMap<ModId, ProviderInfo>,
    /// Capabilities proven unsatisfiable in this session. Only grows; never rolled back.
    unresolvable: FxHashSet<ModId>,
    path: BTreeMap<ModId, ResolutionInfo>,
}

/// The pieces restored when a tentative activation is rolled back.
struct Snapshot {
    effective: ModSet,
    chosen: FxHashMap<ModId, ProviderInfo>,
    path: BTreeMap<ModId, ResolutionInfo>,
}

impl Session<'_> {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            effective: self.effective.clone(),
            chosen: self.chosen.clone(),
            path: self.path.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.effective = snapshot.effective;
        self.chosen = snapshot.chosen;
        self.path = snapshot.path;
    }

    fn ensure_active(
        &mut self,
        mod_id: &str,
        needed_by: &str,
        reason: ActivationReason,
        satisfied_dep: &str,
        provider: Option<&ProviderInfo>,
    ) -> Result<(), Failure> {
        // Only fully committed activations short-circuit here; a mod still on the DFS stack is
        // in the effective set tentatively and reaching it again means a cycle.
        if let Some(info) = self.path.get_mut(mod_id) {
            if !info.needed_for.iter().any(|id| id == needed_by) {
                info.needed_for.push(needed_by.to_string());
            }
            return Ok(());
        }

        if !self.is_activatable(mod_id) {
            return Err(Failure::NotActivatable(mod_id.to_string()));
        }

        if self.on_stack.contains(mod_id) {
            return Err(Failure::Fatal(ResolveError::CircularDependency {
                mod_id: mod_id.to_string(),
            }));
        }

        let Some(metadata) = self.catalog.get(mod_id) else {
            return Err(Failure::Unknown(mod_id.to_string()));
        };

        let snapshot = self.snapshot();
        self.stack.push(mod_id.to_string());
        self.on_stack.insert(mod_id.to_string());
        self.effective.insert(mod_id.to_string());

        for (dep_id, requirements) in &metadata.depends {
            if is_implicit(dep_id) {
                continue;
            }

            if let Err(failure) = self.resolve_dependency(dep_id, requirements, mod_id) {
                self.stack.pop();
                self.on_stack.remove(mod_id);
                self.restore(snapshot);
                return Err(failure);
            }
        }

        self.stack.pop();
        self.on_stack.remove(mod_id);
        self.path.insert(
            mod_id.to_string(),
            ResolutionInfo {
                reason,
                needed_for: vec![needed_by.to_string()],
                satisfied_dep: satisfied_dep.to_string(),
                provider: provider.cloned(),
            },
        );

        Ok(())
    }

    fn resolve_dependency(
        &mut self,
        dep_id: &str,
        requirements: &[VersionReq],
        requiring_mod: &str,
    ) -> Result<(), Failure> {
        // A capability already pinned to a provider must satisfy every later requirement too,
        // otherwise the collection genuinely cannot run as one set.
        if let Some(pinned) = self.chosen.get(dep_id).cloned() {
            if let Some(requirement) = requirements
                .iter()
                .find(|req| !req.matches(&pinned.provided_version))
            {
                return Err(Failure::Fatal(ResolveError::DependencyConflict {
                    dep_id: dep_id.to_string(),
                    requiring_mod: requiring_mod.to_string(),
                    provider: pinned.mod_id.clone(),
                    provider_version: pinned.provided_version.clone(),
                    requirement: requirement.clone(),
                }));
            }

            return self.ensure_active(
                &pinned.mod_id,
                requiring_mod,
                ActivationReason::Dependency,
                dep_id,
                Some(&pinned),
            );
        }

        if self.unresolvable.contains(dep_id) {
            return Err(Failure::Unsatisfied {
                dep_id: dep_id.to_string(),
                requiring_mod: requiring_mod.to_string(),
            });
        }

        for provider in self.best_providers(dep_id, requirements) {
            let snapshot = self.snapshot();
            self.chosen.insert(dep_id.to_string(), provider.clone());

            match self.ensure_active(
                &provider.mod_id,
                requiring_mod,
                ActivationReason::Dependency,
                dep_id,
                Some(&provider),
            ) {
                Ok(()) => return Ok(()),
                Err(Failure::Fatal(error)) => return Err(Failure::Fatal(error)),
                Err(_) => self.restore(snapshot),
            }
        }

        self.unresolvable.insert(dep_id.to_string());
        Err(Failure::Unsatisfied {
            dep_id: dep_id.to_string(),
            requiring_mod: requiring_mod.to_string(),
        })
    }

    /// Usable providers for `dep_id` in preference order: the catalog pre-sorts by provided
    /// version (desc), directness (desc), then mod ID, and this filters down to activatable
    /// mods at compatible versions.
    fn best_providers(&self, dep_id: &str, requirements: &[VersionReq]) -> Vec<ProviderInfo> {
        self.catalog
            .providers_of(dep_id)
            .iter()
            .filter(|provider| {
                self.is_activatable(&provider.mod_id)
                    && requirements.iter().all(|req| req.matches(&provider.provided_version))
            })
            .cloned()
            .collect()
    }

    fn is_activatable(&self, mod_id: &str) -> bool {
        self.statuses.get(mod_id).is_some_and(|status| status.is_activatable())
    }

    /// Reject the finished effective set if any member breaks a capability another member
    /// provides. Checks the pinned provider for the capability first and falls back to any
    /// member whose effective provides cover it (direct targets are never pinned).
    fn validate_breaks(&self) -> Result<(), ResolveError> {
        for mod_id in self.effective.iter() {
            let Some(metadata) = self.catalog.get(mod_id) else {
                continue;
            };

            for (broken_id, requirements) in &metadata.breaks {
                let Some(provided_version) = self.provided_version_of(broken_id) else {
                    continue;
                };

                if let Some(requirement) = requirements.iter().find(|req| req.matches(&provided_version)) {
                    return Err(ResolveError::BreaksViolation {
                        broken_by: mod_id.clone(),
                        broken_id: broken_id.clone(),
                        provider_version: provided_version,
                        requirement: requirement.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn provided_version_of(&self, capability: &str) -> Option<Version> {
        if let Some(pinned) = self.chosen.get(capability) {
            return Some(pinned.provided_version.clone());
        }

        self.effective
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .filter_map(|metadata| metadata.effective_provides().get(capability).cloned())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::{EmbeddedModule, ModMetadata};
    use crate::state::StateManager;

    struct Universe {
        mods: Vec<ModMetadata>,
    }

    impl Universe {
        fn new() -> Self {
            Self { mods: Vec::new() }
        }

        fn with(mut self, id: &str, version: &str, build: impl FnOnce(&mut ModMetadata)) -> Self {
            let mut metadata = ModMetadata {
                id: id.to_string(),
                version: Version::parse(version),
                depends: BTreeMap::new(),
                breaks: BTreeMap::new(),
                provides: ModSet::new(),
                embedded: Vec::new(),
                base_filename: id.to_string(),
                initially_active: true,
            };
            build(&mut metadata);
            self.mods.push(metadata);
            self
        }

        fn build(self) -> (Resolver, StateManager) {
            let catalog = Arc::new(ModCatalog::new(self.mods));
            let manager = StateManager::new(catalog.clone(), &ModSet::new());
            (Resolver::new(catalog), manager)
        }
    }

    fn depends(metadata: &mut ModMetadata, dep: &str, req: &str) {
        metadata.depends.insert(dep.to_string(), vec![VersionReq::parse(req)]);
    }

    fn target(ids: &[&str]) -> ModSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn dependencies_are_pulled_in() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "lib", ">=1.0"))
            .with("lib", "1.2.0", |_| {})
            .build();

        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app", "lib"]);
        assert_eq!(resolution.path["app"].reason, ActivationReason::Target);
        assert_eq!(resolution.path["lib"].reason, ActivationReason::Dependency);
        assert_eq!(resolution.path["lib"].needed_for, ["app"]);
    }

    #[test]
    fn force_enabled_mods_join_every_resolution() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |_| {})
            .with("extra", "1.0.0", |_| {})
            .build();

        manager.set_force_enabled("extra", true);
        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app", "extra"]);
        assert_eq!(resolution.path["extra"].reason, ActivationReason::Forced);
    }

    #[test]
    fn the_best_provider_wins() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "api", ">=1.0"))
            .with("impl_old", "1.0.0", |m| {
                m.provides.insert("api".to_string());
            })
            .with("impl_new", "2.0.0", |m| {
                m.provides.insert("api".to_string());
            })
            .build();

        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app", "impl_new"]);
    }

    #[test]
    fn a_failing_provider_backtracks_to_the_next() {
        // impl_new would win on version but depends on something force-disabled.
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "api", "*"))
            .with("impl_new", "2.0.0", |m| {
                m.provides.insert("api".to_string());
                depends(m, "doomed", "*");
            })
            .with("impl_old", "1.0.0", |m| {
                m.provides.insert("api".to_string());
            })
            .with("doomed", "1.0.0", |_| {})
            .build();

        manager.set_force_disabled("doomed", true);
        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app", "impl_old"]);
    }

    #[test]
    fn version_requirements_filter_providers() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "lib", "<2.0"))
            .with("lib", "2.5.0", |_| {})
            .build();

        let error = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap_err();

        assert!(matches!(error, ResolveError::UnsatisfiedDependency { dep_id, .. } if dep_id == "lib"));
    }

    #[test]
    fn conflicting_requirements_on_a_pinned_provider_are_fatal() {
        let (resolver, manager) = Universe::new()
            .with("one", "1.0.0", |m| depends(m, "lib", ">=2.0"))
            .with("two", "1.0.0", |m| depends(m, "lib", "<2.0"))
            .with("lib", "2.0.0", |_| {})
            .build();

        let error = resolver
            .resolve_effective_set(&target(&["one", "two"]), &manager.snapshot())
            .unwrap_err();

        assert!(matches!(
            error,
            ResolveError::DependencyConflict { dep_id, requiring_mod, .. }
                if dep_id == "lib" && requiring_mod == "two"
        ));
    }

    #[test]
    fn circular_dependencies_are_fatal() {
        let (resolver, manager) = Universe::new()
            .with("a", "1.0.0", |m| depends(m, "b", "*"))
            .with("b", "1.0.0", |m| depends(m, "a", "*"))
            .build();

        let error = resolver
            .resolve_effective_set(&target(&["a"]), &manager.snapshot())
            .unwrap_err();

        assert!(matches!(error, ResolveError::CircularDependency { .. }));
    }

    #[test]
    fn breaks_rejects_the_finished_set() {
        let (resolver, manager) = Universe::new()
            .with("grumpy", "1.0.0", |m| {
                m.breaks.insert("victim".to_string(), vec![VersionReq::parse("<2.0")]);
            })
            .with("victim", "1.5.0", |_| {})
            .build();

        let error = resolver
            .resolve_effective_set(&target(&["grumpy", "victim"]), &manager.snapshot())
            .unwrap_err();

        assert!(matches!(
            error,
            ResolveError::BreaksViolation { broken_by, broken_id, .. }
                if broken_by == "grumpy" && broken_id == "victim"
        ));
    }

    #[test]
    fn breaks_tolerates_compatible_versions() {
        let (resolver, manager) = Universe::new()
            .with("grumpy", "1.0.0", |m| {
                m.breaks.insert("victim".to_string(), vec![VersionReq::parse("<2.0")]);
            })
            .with("victim", "2.1.0", |_| {})
            .build();

        let resolution = resolver
            .resolve_effective_set(&target(&["grumpy", "victim"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.len(), 2);
    }

    #[test]
    fn implicit_capabilities_never_resolve() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| {
                depends(m, "minecraft", ">=1.20");
                depends(m, "fabricloader", ">=0.14");
            })
            .build();

        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app"]);
    }

    #[test]
    fn embedded_modules_satisfy_dependencies() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "library", ">=0.4"))
            .with("bundle", "1.0.0", |m| {
                m.embedded.push(EmbeddedModule {
                    id: "library".to_string(),
                    version: Version::parse("0.5.0"),
                    provides: ModSet::new(),
                });
            })
            .build();

        let resolution = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap();

        assert_eq!(resolution.effective_set.to_sorted_vec(), ["app", "bundle"]);
    }

    #[test]
    fn missing_target_fails_without_poisoning_the_process() {
        let (resolver, manager) = Universe::new().with("app", "1.0.0", |_| {}).build();

        let error = resolver
            .resolve_effective_set(&target(&["nope"]), &manager.snapshot())
            .unwrap_err();
        assert!(matches!(error, ResolveError::UnknownMod { .. }));

        // The same resolver still works for a valid target.
        assert!(resolver.resolve_effective_set(&target(&["app"]), &manager.snapshot()).is_ok());
    }

    #[test]
    fn resolution_is_deterministic() {
        let (resolver, manager) = Universe::new()
            .with("app", "1.0.0", |m| depends(m, "api", "*"))
            .with("x_impl", "1.0.0", |m| {
                m.provides.insert("api".to_string());
            })
            .with("y_impl", "1.0.0", |m| {
                m.provides.insert("api".to_string());
            })
            .build();

        let snapshot = manager.snapshot();
        let first = resolver.resolve_effective_set(&target(&["app"]), &snapshot).unwrap();

        for _ in 0..10 {
            let again = resolver.resolve_effective_set(&target(&["app"]), &snapshot).unwrap();
            assert_eq!(again.effective_set, first.effective_set);
        }

        // Equal version and directness, so the ID decides.
        assert!(first.effective_set.contains("x_impl"));
    }

    #[test]
    fn direct_unresolvable_check_is_one_pass() {
        let (resolver, manager) = Universe::new()
            .with("a", "1.0.0", |m| depends(m, "ghost", "*"))
            .with("b", "1.0.0", |m| depends(m, "a", "*"))
            .with("c", "1.0.0", |_| {})
            .build();

        let available = manager.activatable_set();
        let direct = resolver.directly_unresolvable(&available);

        // Only `a` is directly unresolvable; `b`'s dependency on `a` still has a provider in
        // the available set.
        assert_eq!(direct.to_sorted_vec(), ["a"]);
    }

    #[test]
    fn transitive_unresolvable_reaches_a_fixpoint() {
        let (resolver, manager) = Universe::new()
            .with("a", "1.0.0", |m| depends(m, "ghost", "*"))
            .with("b", "1.0.0", |m| depends(m, "a", "*"))
            .with("c", "1.0.0", |m| depends(m, "b", "*"))
            .with("d", "1.0.0", |_| {})
            .build();

        let available = manager.activatable_set();
        let unresolvable = resolver.transitively_unresolvable(&available);

        assert_eq!(unresolvable.to_sorted_vec(), ["a", "b", "c"]);

        // Removing the output from the input yields no new unresolvables.
        let remaining = available.subtract(&unresolvable);
        assert!(resolver.directly_unresolvable(&remaining).is_empty());
    }

    #[test]
    fn unresolvable_check_respects_version_compatibility() {
        let (resolver, manager) = Universe::new()
            .with("a", "1.0.0", |m| depends(m, "lib", ">=2.0"))
            .with("lib", "1.0.0", |_| {})
            .build();

        let unresolvable = resolver.transitively_unresolvable(&manager.activatable_set());
        assert_eq!(unresolvable.to_sorted_vec(), ["a"]);
    }

    #[test]
    fn empty_target_resolves_to_nothing() {
        let (resolver, manager) = Universe::new().with("app", "1.0.0", |_| {}).build();

        let resolution = resolver
            .resolve_effective_set(&ModSet::new(), &manager.snapshot())
            .unwrap();
        assert!(resolution.effective_set.is_empty());
    }

    #[test]
    fn statuses_gate_activation() {
        let (resolver, manager) = Universe::new().with("app", "1.0.0", |_| {}).build();
        manager.set_force_disabled("app", true);

        let error = resolver
            .resolve_effective_set(&target(&["app"]), &manager.snapshot())
            .unwrap_err();
        assert!(matches!(error, ResolveError::TargetNotActivatable { mod_id } if mod_id == "app"));
    }
}
