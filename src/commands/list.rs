//! Commands for inspecting a mod collection without starting a bisection.

use crate::mods::loader::{self, LoadedCollection};
use crate::mods::set::ModSet;
use crate::resolver::Resolver;
use crate::state::StateManager;
use anyhow::{Context, Result};
use clap::Subcommand;
use regex_lite::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Commands for listing the collection, its provider table, and its unresolvable mods.
#[derive(Subcommand)]
pub enum ListCommand {
    /// Lists every mod in the collection with its version, dependencies, and file state.
    Mods {
        /// The mods directory to scan.
        mods_dir: PathBuf,
        /// Print JSON instead of a human readable format.
        #[arg(short, long)]
        json: bool,
        /// Only list mods whose ID matches this regular expression.
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Lists the capability provider table in resolver preference order.
    Providers {
        /// The mods directory to scan.
        mods_dir: PathBuf,
        /// Print JSON instead of a human readable format.
        #[arg(short, long)]
        json: bool,
        /// Only list capabilities whose ID matches this regular expression.
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Lists the mods that cannot be resolved with the collection as it stands, and why.
    Unresolvable {
        /// The mods directory to scan.
        mods_dir: PathBuf,
        /// Print JSON instead of a human readable format.
        #[arg(short, long)]
        json: bool,
    },
}

pub fn list(command: ListCommand) -> Result<ExitCode> {
    match command {
        ListCommand::Mods { mods_dir, json, filter } => list_mods(&mods_dir, json, filter.as_deref()),
        ListCommand::Providers { mods_dir, json, filter } => list_providers(&mods_dir, json, filter.as_deref()),
        ListCommand::Unresolvable { mods_dir, json } => list_unresolvable(&mods_dir, json),
    }
}

fn load(mods_dir: &Path) -> Result<LoadedCollection> {
    loader::load_mods(mods_dir, |done, total| {
        log::debug!("Loading mod metadata ({done}/{total})");
    })
}

fn parse_filter(filter: Option<&str>) -> Result<Option<Regex>> {
    filter
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("Could not parse the filter regular expression '{pattern}'"))
        })
        .transpose()
}

fn list_mods(mods_dir: &Path, json: bool, filter: Option<&str>) -> Result<ExitCode> {
    let loaded = load(mods_dir)?;
    let filter = parse_filter(filter)?;

    let mods: Vec<_> = loaded
        .catalog
        .mods()
        .filter(|metadata| filter.as_ref().is_none_or(|regex| regex.is_match(&metadata.id)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&mods).expect("Could not format JSON"));
    } else {
        pretty::print_mods(&mods, &loaded.missing);
    }

    Ok(ExitCode::SUCCESS)
}

fn list_providers(mods_dir: &Path, json: bool, filter: Option<&str>) -> Result<ExitCode> {
    let loaded = load(mods_dir)?;
    let filter = parse_filter(filter)?;

    let providers: Vec<_> = loaded
        .catalog
        .providers()
        .filter(|(capability, _)| filter.as_ref().is_none_or(|regex| regex.is_match(capability)))
        .collect();

    if json {
        let as_map: std::collections::BTreeMap<_, _> = providers.iter().cloned().collect();
        println!("{}", serde_json::to_string_pretty(&as_map).expect("Could not format JSON"));
    } else {
        pretty::print_providers(&providers);
    }

    Ok(ExitCode::SUCCESS)
}

/// One unresolvable mod and the dependencies that sank it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct UnresolvableMod {
    id: String,
    unsatisfied: Vec<String>,
}

fn list_unresolvable(mods_dir: &Path, json: bool) -> Result<ExitCode> {
    let loaded = load(mods_dir)?;
    let catalog = Arc::new(loaded.catalog);

    let manager = StateManager::new(catalog.clone(), &loaded.missing);
    let resolver = Resolver::new(catalog.clone());

    let available = manager.activatable_set();
    let unresolvable = resolver.transitively_unresolvable(&available);
    let remaining = available.subtract(&unresolvable);

    let entries: Vec<UnresolvableMod> = unresolvable
        .iter()
        .map(|id| UnresolvableMod {
            id: id.clone(),
            unsatisfied: unsatisfied_dependencies(&catalog, id, &remaining),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries).expect("Could not format JSON"));
    } else {
        pretty::print_unresolvable(&entries, catalog.len());
    }

    Ok(ExitCode::SUCCESS)
}

/// The dependency entries of `id` that no mod surviving the unresolvability analysis
/// satisfies. Empty for mods that are only unresolvable through a doomed dependency chain.
fn unsatisfied_dependencies(catalog: &crate::mods::ModCatalog, id: &str, remaining: &ModSet) -> Vec<String> {
    let Some(metadata) = catalog.get(id) else {
        return Vec::new();
    };

    metadata
        .depends
        .iter()
        .filter(|(dep_id, _)| !crate::mods::is_implicit(dep_id))
        .filter(|(dep_id, requirements)| {
            !catalog.providers_of(dep_id).iter().any(|provider| {
                remaining.contains(&provider.mod_id)
                    && requirements.iter().all(|req| req.matches(&provider.provided_version))
            })
        })
        .map(|(dep_id, requirements)| {
            if requirements.is_empty() {
                dep_id.clone()
            } else {
                let requirements: Vec<String> = requirements.iter().map(|req| req.to_string()).collect();
                format!("{} {}", dep_id, requirements.join(" "))
            }
        })
        .collect()
}

mod pretty {
    use super::UnresolvableMod;
    use crate::cli::{Report, count_of};
    use crate::mods::set::ModSet;
    use crate::mods::{ModId, ModMetadata, ProviderInfo};
    use yansi::Paint;

    pub fn print_mods(mods: &[&ModMetadata], missing: &ModSet) {
        for metadata in mods {
            let mut rows = vec![("version".to_string(), metadata.version.to_string())];

            if !metadata.provides.is_empty() {
                rows.push(("provides".to_string(), metadata.provides.to_string()));
            }

            if !metadata.embedded.is_empty() {
                let embedded: Vec<String> = metadata
                    .embedded
                    .iter()
                    .map(|module| format!("{} {}", module.id, module.version))
                    .collect();
                rows.push(("embeds".to_string(), embedded.join(", ")));
            }

            if !metadata.depends.is_empty() {
                let depends: Vec<String> = metadata.depends.keys().cloned().collect();
                rows.push(("depends".to_string(), depends.join(", ")));
            }

            if !metadata.breaks.is_empty() {
                let breaks: Vec<String> = metadata.breaks.keys().cloned().collect();
                rows.push(("breaks".to_string(), breaks.join(", ")));
            }

            rows.push(("file".to_string(), format!("{}.jar", metadata.base_filename)));

            let state = if missing.contains(&metadata.id) {
                "MISSING".red().to_string()
            } else if metadata.initially_active {
                "enabled".green().to_string()
            } else {
                "disabled".dim().to_string()
            };

            let report = Report::new(metadata.id.clone()).status(state).rows(rows);
            println!("\n{report}");
        }

        println!("\n{}", count_of(mods.len(), "mod"));
    }

    pub fn print_providers(providers: &[(&ModId, &[ProviderInfo])]) {
        for (capability, candidates) in providers {
            let rows = candidates.iter().map(|provider| {
                let directness = if provider.direct { "direct" } else { "embedded" };
                (
                    provider.mod_id.clone(),
                    format!("{} ({})", provider.provided_version, directness),
                )
            });

            let report = Report::new(capability.to_string())
                .status(count_of(candidates.len(), "provider"))
                .rows(rows);
            println!("\n{report}");
        }

        println!("\n{}", count_of(providers.len(), "capability"));
    }

    pub fn print_unresolvable(entries: &[UnresolvableMod], total_mods: usize) {
        if entries.is_empty() {
            println!("All {} resolve cleanly.", count_of(total_mods, "mod"));
            return;
        }

        for entry in entries {
            let report = if entry.unsatisfied.is_empty() {
                // Unresolvable only through another unresolvable dependency.
                Report::new(entry.id.clone())
                    .status("TRANSITIVE".yellow().to_string())
                    .text("All direct dependencies exist, but at least one of them is itself unresolvable.")
            } else {
                Report::new(entry.id.clone())
                    .status("UNSATISFIED".red().to_string())
                    .rows(entry.unsatisfied.iter().map(|dep| ("needs".to_string(), dep.clone())))
            };

            println!("\n{report}");
        }

        println!(
            "\n{} of {} cannot be resolved",
            count_of(entries.len(), "mod"),
            count_of(total_mods, "mod")
        );
    }
}
