//! The interactive bisection session.
//!
//! The tool picks a subset of mods, enables it on disk, and waits for the user to launch the
//! game and report whether the issue occurred. Repeating that narrows the collection down to a
//! minimal conflict set; further rounds can enumerate additional independent sets.

use crate::activator::{ActivateError, FsActivator};
use crate::cli::{Report, count_of};
use crate::config::Config;
use crate::mods::ModId;
use crate::mods::loader;
use crate::search::bisect::TestOutcome;
use crate::search::engine::EngineError;
use crate::service::{BisectService, PlannedTest, ServiceError};
use crate::state::StateManager;
use anyhow::{Context, Result};
use clap::Args;
use regex_lite::Regex;
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use yansi::Paint;

/// Options for the bisection session.
#[derive(Debug, Args)]
pub struct BisectSettings {
    /// The mods directory to bisect.
    pub mods_dir: PathBuf,
    /// Print the final result as JSON instead of human readable text.
    #[arg(long)]
    pub json: bool,
    /// Omit mods whose ID matches this regular expression from the search.
    ///
    /// Omitted mods are never suspected, but stay available as dependencies of the mods that
    /// are.
    #[arg(short = 'o', long)]
    pub omit: Option<String>,
    /// Leave the mods directory as the last test configured it instead of re-enabling every
    /// mod when the session ends.
    #[arg(long)]
    pub keep_disabled: bool,
}

/// The machine-readable summary printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct SessionReport {
    found_conflict_sets: Vec<Vec<ModId>>,
    unresolvable: Vec<ModId>,
    tests_run: usize,
}

/// What the user answered at a test prompt.
enum Answer {
    Outcome(TestOutcome),
    Undo,
    Quit,
}

pub fn bisect(settings: &BisectSettings) -> Result<ExitCode> {
    let config = Config::from_current()?;

    let loaded = loader::load_mods(&settings.mods_dir, |done, total| {
        log::debug!("Loading mod metadata ({done}/{total})");
    })?;

    if loaded.catalog.is_empty() {
        anyhow::bail!(
            "No mod manifests found in '{}'. Each mod needs a '<name>{}' file next to its jar.",
            settings.mods_dir.display(),
            loader::MANIFEST_SUFFIX
        );
    }

    log::info!(
        "Loaded {} ({} missing on disk)",
        count_of(loaded.catalog.len(), "mod"),
        loaded.missing.len()
    );

    let catalog = Arc::new(loaded.catalog);
    let manager = Arc::new(StateManager::new(catalog.clone(), &loaded.missing));
    config.apply(&manager);

    if let Some(pattern) = &settings.omit {
        let regex =
            Regex::new(pattern).with_context(|| format!("Could not parse the omit regular expression '{pattern}'"))?;
        for id in catalog.ids() {
            if regex.is_match(id) {
                manager.set_omitted(id, true);
            }
        }
    }

    let activator = FsActivator::new(settings.mods_dir.clone(), catalog.clone());
    let mut service = BisectService::new(manager.clone(), Box::new(activator), || {});

    let result = run_session(&mut service);

    if !settings.keep_disabled && let Err(error) = service.restore_all_mods() {
        log::error!("Could not re-enable all mods: {error}");
    }

    result?;

    let report = session_report(&service, &manager);
    if settings.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        pretty_print_summary(&report);
    }

    // A session that found at least one conflict set exits successfully; an aborted or empty
    // search is reported as a failure so scripts can tell the difference.
    if report.found_conflict_sets.is_empty() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_session(service: &mut BisectService) -> Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    loop {
        let reconciled = service.reconcile_state();
        if reconciled.has_changes {
            log::debug!("Reconciled the search with the current mod statuses");
        }
        if !reconciled.newly_unresolvable.is_empty() {
            println!(
                "{} {} can no longer be resolved and left the search: {}",
                "note:".yellow().bold(),
                count_of(reconciled.newly_unresolvable.len(), "mod"),
                reconciled.newly_unresolvable
            );
        }

        match service.plan_and_apply_next_test() {
            Ok(planned) => {
                print_test_prompt(service, &planned);

                match prompt_answer(&mut input)? {
                    Answer::Outcome(outcome) => {
                        service
                            .submit_test_result(outcome, &planned.changes)
                            .context("Could not record the test result")?;
                    }
                    Answer::Undo => {
                        service.cancel_test(&planned.changes).context("Could not cancel the test")?;
                        if service.can_undo() {
                            service.undo_last_step();
                            println!("Rolled back the last answer.");
                        } else {
                            println!("Nothing to undo yet.");
                        }
                    }
                    Answer::Quit => {
                        service.cancel_test(&planned.changes).context("Could not cancel the test")?;
                        return Ok(());
                    }
                }
            }

            Err(ServiceError::Engine(EngineError::SearchComplete)) => {
                print_round_summary(service);

                if service.search_state().conflict_set.is_empty() {
                    // Nothing was found, so another round over the same pool cannot find
                    // anything either.
                    return Ok(());
                }

                if !prompt_yes_no(&mut input, "Search for another independent conflict set?")? {
                    return Ok(());
                }

                let round = service.continue_search().context("Could not start the next round")?;
                println!("Archived conflict set: {}", round.archived_conflict_set);
                if !round.newly_unresolvable.is_empty() {
                    println!(
                        "{} {} can no longer be resolved and left the search: {}",
                        "note:".yellow().bold(),
                        count_of(round.newly_unresolvable.len(), "mod"),
                        round.newly_unresolvable
                    );
                }
                println!("Starting round {}.", round.round);
            }

            Err(ServiceError::NeedsReconciliation) => continue,

            Err(ServiceError::Activate(ActivateError::MissingFiles(missing))) => {
                println!(
                    "{} {} vanished from disk; rechecking the collection.",
                    "note:".yellow().bold(),
                    count_of(missing.len(), "mod file")
                );
            }

            Err(error) => return Err(error).context("Could not set up the next test"),
        }
    }
}

fn print_test_prompt(service: &BisectService, planned: &PlannedTest) {
    let state = service.search_state();

    let header = format!(
        "Round {} · iteration {} · step {}",
        state.round,
        state.iteration,
        state.step + 1
    );

    let body = if planned.plan.verification {
        "Verifying that the conflict set found so far is sufficient on its own.".to_string()
    } else {
        let confirmed = planned.plan.mods_to_test.intersect(&state.conflict_set);
        if confirmed.is_empty() {
            format!("Narrowing {} remaining suspect(s).", state.candidates.len())
        } else {
            format!(
                "Narrowing {} remaining suspect(s); {} confirmed mod(s) ride along.",
                state.candidates.len(),
                confirmed.len()
            )
        }
    };

    let report = Report::new(header)
        .status(format!("≤{} tests left", state.estimated_max_tests()).dim().to_string())
        .text(body)
        .row("testing", planned.plan.mods_to_test.to_string())
        .row("enabled", count_of(planned.effective.len(), "mod"));

    println!("\n{report}");
    println!("Launch the game now and check whether the issue occurs.");
}

fn print_round_summary(service: &BisectService) {
    let conflict_set = &service.search_state().conflict_set;

    let report = if conflict_set.is_empty() {
        Report::new("Round complete")
            .status("NONE".green().to_string())
            .text("No conflict set was found in the remaining mods.")
    } else {
        Report::new("Round complete")
            .status("FOUND".red().bold().to_string())
            .status(count_of(conflict_set.len(), "mod"))
            .text("The smallest set of mods that still reproduces the issue:")
            .rows(conflict_set.iter().map(|id| ("conflict".to_string(), id.clone())))
    };

    println!("\n{report}");
}

fn pretty_print_summary(report: &SessionReport) {
    let mut summary = Report::new("Bisection summary").status(count_of(report.tests_run, "test"));

    if report.found_conflict_sets.is_empty() {
        summary = summary.text("No conflict sets were identified.");
    } else {
        for (index, conflict_set) in report.found_conflict_sets.iter().enumerate() {
            summary = summary.child(
                Report::new(format!("Conflict set {}", index + 1))
                    .status(count_of(conflict_set.len(), "mod"))
                    .text(conflict_set.join(", ")),
            );
        }
    }

    if !report.unresolvable.is_empty() {
        summary = summary.text(format!(
            "Left out as unresolvable: {}",
            report.unresolvable.join(", ")
        ));
    }

    println!("\n{summary}");
}

fn session_report(service: &BisectService, manager: &StateManager) -> SessionReport {
    let mut found_conflict_sets: Vec<Vec<ModId>> = service
        .archive()
        .found_conflict_sets()
        .iter()
        .map(|set| set.to_sorted_vec())
        .collect();

    // The current round's result has not been archived unless the user continued past it.
    let current = &service.search_state().conflict_set;
    if service.search_state().complete && !current.is_empty() {
        found_conflict_sets.push(current.to_sorted_vec());
    }

    SessionReport {
        found_conflict_sets,
        unresolvable: manager.unresolvable_set().to_sorted_vec(),
        tests_run: service.archive().archived_log().len() + service.execution_log().len(),
    }
}

fn prompt_answer(input: &mut impl BufRead) -> Result<Answer> {
    loop {
        println!("{}", "Did the issue occur? [f]ail / [g]ood / [u]ndo / [q]uit".bold());

        let Some(line) = read_line(input)? else {
            return Ok(Answer::Quit);
        };

        match line.trim().to_ascii_lowercase().as_str() {
            "f" => return Ok(Answer::Outcome(TestOutcome::Fail)),
            "g" => return Ok(Answer::Outcome(TestOutcome::Good)),
            "u" => return Ok(Answer::Undo),
            "q" => return Ok(Answer::Quit),
            other => {
                if let Ok(outcome) = TestOutcome::from_str(other) {
                    return Ok(Answer::Outcome(outcome));
                }
                println!("Please answer with one of the listed letters.");
            }
        }
    }
}

fn prompt_yes_no(input: &mut impl BufRead, question: &str) -> Result<bool> {
    loop {
        println!("{} {}", question.bold(), "[y/n]".dim());

        let Some(line) = read_line(input)? else {
            return Ok(false);
        };

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => println!("Please answer y or n."),
        }
    }
}

/// Read one line, returning `None` on end of input.
fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Could not read from the terminal")?;
    Ok((read > 0).then_some(line))
}
