//! The search service: couples the engine, the state manager, the resolver, and the activator,
//! and enforces the invariants between them.
//!
//! A service instance is owned by a single task. External flag edits on the state manager mark
//! the service dirty through the change callback; planning refuses to run until the caller
//! reconciles. The service's own flag writes during reconciliation are exempted through a
//! re-entrancy guard so they cannot re-dirty it.

use crate::activator::{ActivateError, Activator, FileChange};
use crate::mods::set::ModSet;
use crate::resolver::{ResolveError, Resolver};
use crate::search::archive::SearchArchive;
use crate::search::bisect::{NextStep, SearchState, TestOutcome, TestPlan};
use crate::search::engine::{CompletedTest, Engine, EngineError};
use crate::state::StateManager;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Activate(#[from] ActivateError),

    /// Mod statuses changed since the last reconciliation; reconcile and retry.
    #[error("mod state changed, reconcile before planning the next test")]
    NeedsReconciliation,

    /// A round transition was requested before the current round finished.
    #[error("the current round has not finished")]
    RoundNotComplete,
}

/// A planned test, materialized on disk and awaiting the user's verdict.
#[derive(Debug)]
pub struct PlannedTest {
    pub plan: TestPlan,
    /// The full set of mods enabled for this test, dependencies included.
    pub effective: ModSet,
    /// The renames performed, to be reverted when the verdict arrives.
    pub changes: Vec<FileChange>,
}

/// What a reconciliation pass changed.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub has_changes: bool,
    pub newly_unresolvable: ModSet,
}

/// What a round transition did.
#[derive(Debug)]
pub struct RoundReport {
    /// The conflict set archived from the finished round. Empty when the round found nothing.
    pub archived_conflict_set: ModSet,
    pub newly_unresolvable: ModSet,
    /// The new round number.
    pub round: u32,
}

pub struct BisectService {
    state: Arc<StateManager>,
    resolver: Resolver,
    activator: Box<dyn Activator>,
    engine: Engine,
    archive: SearchArchive,
    needs_reconciliation: Arc<AtomicBool>,
    reconciling: Arc<AtomicBool>,
}

impl BisectService {
    /// Build a service over loaded state. `notify` is forwarded to the UI whenever an external
    /// mutation lands on the state manager; it never fires for the service's own
    /// reconciliation writes. The service starts dirty so the first reconciliation computes
    /// the unresolvable flags.
    pub fn new(
        state: Arc<StateManager>,
        activator: Box<dyn Activator>,
        notify: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        let needs_reconciliation = Arc::new(AtomicBool::new(true));
        let reconciling = Arc::new(AtomicBool::new(false));

        {
            let needs_reconciliation = needs_reconciliation.clone();
            let reconciling = reconciling.clone();
            state.set_on_state_changed(move || {
                if !reconciling.load(Ordering::SeqCst) {
                    needs_reconciliation.store(true, Ordering::SeqCst);
                    notify();
                }
            });
        }

        let engine = Engine::new(state.search_candidate_set().to_sorted_vec(), 1);
        let resolver = Resolver::new(state.catalog().clone());

        Self {
            state,
            resolver,
            activator,
            engine,
            archive: SearchArchive::new(),
            needs_reconciliation,
            reconciling,
        }
    }

    pub fn search_state(&self) -> &SearchState {
        self.engine.state()
    }

    pub fn archive(&self) -> &SearchArchive {
        &self.archive
    }

    pub fn execution_log(&self) -> &[CompletedTest] {
        self.engine.execution_log()
    }

    pub fn needs_reconciliation(&self) -> bool {
        self.needs_reconciliation.load(Ordering::SeqCst)
    }

    pub fn can_undo(&self) -> bool {
        self.engine.can_undo()
    }

    /// Recompute the unresolvable flags from the current statuses and synchronize the engine's
    /// candidate pool. A no-op while the service is clean.
    pub fn reconcile_state(&mut self) -> ReconcileReport {
        if !self.needs_reconciliation() {
            return ReconcileReport::default();
        }

        self.reconciling.store(true, Ordering::SeqCst);

        let expected = self.resolver.transitively_unresolvable(&self.state.activatable_set());
        let current = self.state.unresolvable_set();
        let newly_unresolvable = expected.subtract(&current);
        let newly_resolvable = current.subtract(&expected);

        self.state.set_unresolvable_batch(&newly_unresolvable, true);
        self.state.set_unresolvable_batch(&newly_resolvable, false);

        let engine_changed = self.engine.reconcile(&self.state.search_candidate_set());
        if !self.engine.pending_additions().is_empty() {
            log::debug!(
                "{} candidate(s) queued until the next verification boundary",
                self.engine.pending_additions().len()
            );
        }

        self.reconciling.store(false, Ordering::SeqCst);
        self.needs_reconciliation.store(false, Ordering::SeqCst);

        if !newly_unresolvable.is_empty() {
            log::info!("{} mod(s) are no longer resolvable: {}", newly_unresolvable.len(), newly_unresolvable);
        }

        ReconcileReport {
            has_changes: engine_changed || !newly_unresolvable.is_empty() || !newly_resolvable.is_empty(),
            newly_unresolvable,
        }
    }

    /// Plan the next test, resolve it to an effective set, and materialize that set on disk.
    /// The caller runs the external test and reports back through
    /// [`submit_test_result`](Self::submit_test_result) or [`cancel_test`](Self::cancel_test).
    pub fn plan_and_apply_next_test(&mut self) -> Result<PlannedTest, ServiceError> {
        if self.needs_reconciliation() {
            return Err(ServiceError::NeedsReconciliation);
        }

        let plan = self.engine.plan_next_test()?;
        let statuses = self.state.snapshot();

        let resolution = match self.resolver.resolve_effective_set(&plan.mods_to_test, &statuses) {
            Ok(resolution) => resolution,
            Err(error) => {
                self.engine.invalidate_active_plan();
                return Err(error.into());
            }
        };

        // User overrides have the final word over the resolver's picks.
        let forced: ModSet = statuses
            .iter()
            .filter(|(_, status)| status.force_enabled)
            .map(|(id, _)| id)
            .collect();
        let effective: ModSet = resolution
            .effective_set
            .union(&forced)
            .into_iter()
            .filter(|id| statuses.get(id).is_some_and(|status| status.is_activatable()))
            .collect();

        let changes = match self.activator.apply(&effective, &statuses) {
            Ok(changes) => changes,
            Err(ActivateError::MissingFiles(missing)) => {
                self.engine.invalidate_active_plan();

                // Reclassify and force a reconciliation pass; the caller may then retry.
                let gone: ModSet = missing.iter().map(|(id, _)| id.clone()).collect();
                log::warn!("Mod file(s) disappeared: {}", gone);
                self.state.set_missing_batch(&gone, true);

                return Err(ActivateError::MissingFiles(missing).into());
            }
            Err(error) => {
                self.engine.invalidate_active_plan();
                return Err(error.into());
            }
        };

        log::debug!(
            "Testing {} mod(s) ({} enabled after resolution)",
            plan.mods_to_test.len(),
            effective.len()
        );

        Ok(PlannedTest { plan, effective, changes })
    }

    /// Revert the test's file changes and feed the outcome into the search.
    pub fn submit_test_result(&mut self, outcome: TestOutcome, changes: &[FileChange]) -> Result<(), ServiceError> {
        self.activator.revert(changes)?;
        self.engine.submit_test_result(outcome)?;
        Ok(())
    }

    /// Revert the test's file changes and forget the plan without recording an outcome.
    pub fn cancel_test(&mut self, changes: &[FileChange]) -> Result<(), ServiceError> {
        self.activator.revert(changes)?;
        if self.engine.has_active_plan() {
            log::debug!("Cancelled the active test");
            self.engine.invalidate_active_plan();
        }
        Ok(())
    }

    /// Roll back the last submitted result. Marks the service dirty: the restored state may
    /// reference mods that have since become unresolvable or missing.
    pub fn undo_last_step(&mut self) -> Option<TestPlan> {
        let undone = self.engine.undo();
        if undone.is_some() {
            self.needs_reconciliation.store(true, Ordering::SeqCst);

            if let NextStep::Test(plan) = self.engine.current_test_plan() {
                log::debug!("Rolled back; the next test covers {} mod(s) again", plan.mods_to_test.len());
            }
        }
        undone
    }

    /// Archive the finished round and start the next one over the remaining candidates. The
    /// archived conflict set is flagged problematic so it stays out of future rounds.
    pub fn continue_search(&mut self) -> Result<RoundReport, ServiceError> {
        if !self.engine.state().complete {
            return Err(ServiceError::RoundNotComplete);
        }

        let conflict_set = self.engine.state().conflict_set.clone();
        if !conflict_set.is_empty() {
            self.state.set_problematic_batch(&conflict_set, true);
        }

        self.archive.add_found_conflict_set(conflict_set.clone());
        self.archive.append_log(self.engine.execution_log());

        // Rebuilding the pool below also folds in any additions the old engine was still
        // holding back, so nothing queued mid-round is lost.
        self.needs_reconciliation.store(true, Ordering::SeqCst);
        let report = self.reconcile_state();

        let round = self.engine.state().round + 1;
        self.engine = Engine::new(self.state.search_candidate_set().to_sorted_vec(), round);

        Ok(RoundReport {
            archived_conflict_set: conflict_set,
            newly_unresolvable: report.newly_unresolvable,
            round,
        })
    }

    /// Throw away every search result and start from scratch: all cross-round flags cleared,
    /// a fresh archive, and a fresh engine over the full collection.
    pub fn reset_search(&mut self) {
        self.state.clear_search_flags();
        self.archive = SearchArchive::new();
        self.engine = Engine::new(self.state.catalog().ids().to_vec(), 1);
        self.needs_reconciliation.store(true, Ordering::SeqCst);
    }

    /// Bring every mod that still has a file back to enabled. Used when the session ends.
    pub fn restore_all_mods(&mut self) -> Result<(), ServiceError> {
        self.activator.enable_all(&self.state.snapshot())?;
        Ok(())
    }
}
