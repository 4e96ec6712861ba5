//! The pure bisection state machine.
//!
//! Iterative minimal conflict search: each iteration runs a recursive bisection over the
//! candidate pool to isolate one mod that is necessary for the failure, then a verification
//! test checks whether the conflict set found so far already reproduces it on its own. The
//! functions here are pure state transitions; the [`engine`](super::engine) owns the state and
//! the test lifecycle around them.

use crate::mods::ModId;
use crate::mods::set::{ModSet, split_half};
use serde::{Deserialize, Serialize};

/// The user-reported outcome of running the host with a planned set of mods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// The issue did not occur.
    Good,
    /// The issue reproduced.
    Fail,
}

/// One test the user is asked to run: enable exactly these mods (plus whatever the resolver
/// pulls in) and report the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestPlan {
    pub mods_to_test: ModSet,
    /// A verification test of the conflict set alone, confirming it is already sufficient.
    pub verification: bool,
}

/// One frame of the recursive bisection: the mods known to be required on this path, and the
/// ordered pool still being narrowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchStep {
    pub stable_set: ModSet,
    pub candidates: Vec<ModId>,
}

/// The complete search state. Replaced wholesale on every transition; cloning it is how undo
/// frames are made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchState {
    /// The universe at engine creation. Only used for progress estimates and reconciliation.
    pub all_mod_ids: Vec<ModId>,
    /// The pool being searched this round, in insertion order. Bisections consume from the
    /// front and removals preserve relative order.
    pub candidates: Vec<ModId>,
    /// Mods proven necessary this round.
    pub conflict_set: ModSet,
    /// Mods known to be in every failing test on the current bisection path.
    pub stable_set: ModSet,
    pub search_stack: Vec<SearchStep>,
    /// The next test should check whether the conflict set alone already fails.
    pub verifying: bool,
    pub complete: bool,
    pub last_found: Option<ModId>,
    pub last_outcome: Option<TestOutcome>,
    pub round: u32,
    pub iteration: u32,
    pub step: u32,
}

/// What the planner wants next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Test(TestPlan),
    /// Nothing left to test this round.
    Complete,
}

impl SearchState {
    /// A fresh search over `candidates`, preserving their order.
    pub fn new(candidates: Vec<ModId>, round: u32) -> Self {
        Self {
            all_mod_ids: candidates.clone(),
            candidates,
            conflict_set: ModSet::new(),
            stable_set: ModSet::new(),
            search_stack: Vec::new(),
            verifying: false,
            complete: false,
            last_found: None,
            last_outcome: None,
            round,
            iteration: 1,
            step: 0,
        }
    }

    /// An upper bound on the number of tests left, for progress display only.
    pub fn estimated_max_tests(&self) -> u32 {
        let problems = self.conflict_set.len().max(1) as u32;
        problems * (log2_ceil(self.all_mod_ids.len()) + 1)
    }
}

fn log2_ceil(n: usize) -> u32 {
    match n {
        0 | 1 => 0,
        n => usize::BITS - (n - 1).leading_zeros(),
    }
}

/// Compute the next test without changing anything.
pub fn plan_next_test(state: &SearchState) -> NextStep {
    if state.complete {
        return NextStep::Complete;
    }

    if let Some(top) = state.search_stack.last() {
        let (first, _) = split_half(&top.candidates);
        return NextStep::Test(TestPlan {
            mods_to_test: top.stable_set.union(&ModSet::from_slice(first)),
            verification: false,
        });
    }

    if state.verifying {
        return NextStep::Test(TestPlan {
            mods_to_test: state.conflict_set.clone(),
            verification: true,
        });
    }

    if state.candidates.is_empty() {
        return NextStep::Complete;
    }

    let (first, _) = split_half(&state.candidates);
    NextStep::Test(TestPlan {
        mods_to_test: state.conflict_set.union(&ModSet::from_slice(first)),
        verification: false,
    })
}

/// Apply a reported outcome to the state the plan was made from, producing the next state. The
/// inputs are never mutated.
pub fn apply_outcome(state: &SearchState, plan: &TestPlan, outcome: TestOutcome) -> SearchState {
    let mut next = state.clone();
    next.last_outcome = Some(outcome);

    if plan.verification {
        match outcome {
            // The conflict set alone reproduces the failure: it is sufficient, and every
            // element in it was individually proven necessary. Done for this round.
            TestOutcome::Fail => next.complete = true,
            // More context is still needed; keep searching for further elements.
            TestOutcome::Good => {
                next.verifying = false;
                next.iteration += 1;
                next.step = 0;
            }
        }
        return next;
    }

    next.step += 1;

    let step = match next.search_stack.last() {
        Some(top) => top.clone(),
        None => SearchStep {
            stable_set: next.conflict_set.clone(),
            candidates: next.candidates.clone(),
        },
    };
    let (first, second) = split_half(&step.candidates);

    match outcome {
        TestOutcome::Fail => {
            if let [found] = first {
                // Narrowed down to a single mod that the failure cannot do without.
                let found = found.clone();
                next.conflict_set.insert(found.clone());
                next.stable_set = next.conflict_set.clone();
                next.candidates.retain(|id| *id != found);
                next.last_found = Some(found);
                next.search_stack.clear();
                next.verifying = true;
            } else {
                next.search_stack.push(SearchStep {
                    stable_set: step.stable_set.clone(),
                    candidates: first.to_vec(),
                });
            }
        }

        TestOutcome::Good => {
            next.search_stack.pop();

            if !second.is_empty() {
                // The first half cannot trigger with the current context alone; keep it as
                // context and narrow within the second half.
                next.search_stack.push(SearchStep {
                    stable_set: step.stable_set.union(&ModSet::from_slice(first)),
                    candidates: second.to_vec(),
                });
            } else if next.search_stack.is_empty() {
                // The whole bisection ran dry without a failure.
                next.complete = true;
            }
        }
    }

    next
}
