//! Ownership of the running search: the current state, the in-flight test plan, the undo
//! history, the execution log, and reconciliation against an externally-managed candidate set.
//!
//! The engine is not synchronized; the [`service`](crate::service) owns one and serializes
//! every call.

use crate::mods::ModId;
use crate::mods::set::ModSet;
use crate::search::bisect::{self, NextStep, SearchState, TestOutcome, TestPlan};
use serde::Serialize;
use thiserror::Error;

/// Caller mistakes and the end-of-search signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A plan was committed and has not been resolved yet.
    #[error("a test is already in progress")]
    TestInProgress,
    /// A result was submitted with no committed plan.
    #[error("no test is awaiting a result")]
    NoActivePlan,
    /// There is nothing left to test this round.
    #[error("the search is complete")]
    SearchComplete,
}

/// One finished test, kept for auditing and for the cross-round archive.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompletedTest {
    pub plan: TestPlan,
    pub outcome: TestOutcome,
    pub state_before: SearchState,
}

/// Everything needed to roll one submission back.
#[derive(Debug, Clone)]
struct UndoFrame {
    state: SearchState,
    plan: TestPlan,
}

pub struct Engine {
    state: SearchState,
    undo_stack: Vec<UndoFrame>,
    log: Vec<CompletedTest>,
    /// Candidates that appeared while a bisection was running. Folding them in mid-bisection
    /// would invalidate the stack, so they wait for the next verification boundary.
    pending_additions: ModSet,
    active_plan: Option<TestPlan>,
}

impl Engine {
    /// Start a search round over `candidates`, preserving their order.
    pub fn new(candidates: Vec<ModId>, round: u32) -> Self {
        Self {
            state: SearchState::new(candidates, round),
            undo_stack: Vec::new(),
            log: Vec::new(),
            pending_additions: ModSet::new(),
            active_plan: None,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn execution_log(&self) -> &[CompletedTest] {
        &self.log
    }

    pub fn pending_additions(&self) -> &ModSet {
        &self.pending_additions
    }

    pub fn has_active_plan(&self) -> bool {
        self.active_plan.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// The active plan if one is committed, otherwise a preview of what would run next. Never
    /// changes anything.
    pub fn current_test_plan(&self) -> NextStep {
        match &self.active_plan {
            Some(plan) => NextStep::Test(plan.clone()),
            None => bisect::plan_next_test(&self.state),
        }
    }

    /// Commit the next test plan. Exactly one plan may be in flight at a time.
    pub fn plan_next_test(&mut self) -> Result<TestPlan, EngineError> {
        if self.active_plan.is_some() {
            return Err(EngineError::TestInProgress);
        }

        match bisect::plan_next_test(&self.state) {
            NextStep::Complete => Err(EngineError::SearchComplete),
            NextStep::Test(plan) => {
                self.active_plan = Some(plan.clone());
                Ok(plan)
            }
        }
    }

    /// Drop the committed plan, if any. Idempotent.
    pub fn invalidate_active_plan(&mut self) {
        self.active_plan = None;
    }

    /// Record the outcome of the active plan and advance the search. The pre-submission state
    /// goes onto the undo stack; the execution log gets the completed test appended and is
    /// never rewritten afterwards.
    pub fn submit_test_result(&mut self, outcome: TestOutcome) -> Result<&SearchState, EngineError> {
        let plan = self.active_plan.take().ok_or(EngineError::NoActivePlan)?;

        self.undo_stack.push(UndoFrame {
            state: self.state.clone(),
            plan: plan.clone(),
        });
        self.log.push(CompletedTest {
            plan: plan.clone(),
            outcome,
            state_before: self.state.clone(),
        });

        self.state = bisect::apply_outcome(&self.state, &plan, outcome);

        // A verification boundary is the only safe moment to grow the pool: no bisection stack
        // is alive that could be referencing a stale candidate list.
        if plan.verification && !self.pending_additions.is_empty() {
            self.merge_pending_additions();
        }

        Ok(&self.state)
    }

    /// Roll back the most recent submission, restoring the state wholesale. Any committed plan
    /// is dropped; the execution log keeps its record of the undone test. Returns the plan
    /// whose result was undone.
    pub fn undo(&mut self) -> Option<TestPlan> {
        let frame = self.undo_stack.pop()?;
        self.state = frame.state;
        self.active_plan = None;
        Some(frame.plan)
    }

    /// Synchronize with an external truth about which candidates still exist and are eligible.
    /// Removals take effect immediately everywhere; additions wait in the pending set. Returns
    /// whether anything (including the active plan) changed.
    pub fn reconcile(&mut self, valid_candidates: &ModSet) -> bool {
        let mut changed = false;

        if self.active_plan.is_some() {
            self.invalidate_active_plan();
            changed = true;
        }

        let tracked = ModSet::from_slice(&self.state.candidates).union(&self.pending_additions);
        let removals = tracked.subtract(valid_candidates);
        let additions = valid_candidates.subtract(&tracked);

        if !removals.is_empty() {
            self.remove_candidates(&removals);
            changed = true;
        }

        if !additions.is_empty() {
            self.add_candidates(&additions);
            changed = true;
        }

        changed
    }

    /// Queue candidates to join the pool at the next verification boundary.
    pub fn add_candidates(&mut self, additions: &ModSet) {
        self.pending_additions = self.pending_additions.union(additions);
    }

    /// Drop candidates from every part of the search immediately: the pool, the conflict and
    /// stable sets, every bisection frame (frames left empty disappear), and the pending set.
    pub fn remove_candidates(&mut self, removals: &ModSet) {
        self.state.candidates.retain(|id| !removals.contains(id));
        self.state.conflict_set = self.state.conflict_set.subtract(removals);
        self.state.stable_set = self.state.stable_set.subtract(removals);

        for step in &mut self.state.search_stack {
            step.candidates.retain(|id| !removals.contains(id));
            step.stable_set = step.stable_set.subtract(removals);
        }
        self.state.search_stack.retain(|step| !step.candidates.is_empty());

        self.pending_additions = self.pending_additions.subtract(removals);
    }

    fn merge_pending_additions(&mut self) {
        // Appended in lexicographic order so that two sessions reconciling the same additions
        // in a different sequence still end up with identical pools.
        for id in std::mem::take(&mut self.pending_additions) {
            if !self.state.candidates.contains(&id) && !self.state.conflict_set.contains(&id) {
                self.state.candidates.push(id);
            }
        }
    }
}
