use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::process::ExitCode;
use yansi::Paint;

mod activator;
mod cli;
mod commands;
mod config;
mod debug;
mod mods;
mod resolver;
mod search;
mod service;
mod state;

#[derive(Parser)]
#[command(author, version, about, long_about = None, propagate_version = true)]
struct Cli {
    /// mod-bisect's own logging verbosity.
    ///
    /// This can be used to silence all non-essential output, or to enable more in depth tracing
    /// of the search and the dependency resolver.
    #[arg(short, long, default_value = "info")]
    verbosity: Verbosity,

    #[command(subcommand)]
    command: Command,
}

/// The tool's subcommands.
#[derive(Subcommand)]
enum Command {
    /// Interactively bisect a mods directory down to a minimal conflict set.
    Bisect(commands::bisect::BisectSettings),

    /// List mods, capability providers, or unresolvable mods.
    #[command(subcommand)]
    List(commands::list::ListCommand),
}

/// The verbosity level. Set to `Info` by default. `Trace` can be used to get more information
/// on what the tool is actually doing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Verbosity {
    /// Suppress all logging output from the tool itself.
    Quiet,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    debug::StderrLogger::install(match cli.verbosity {
        Verbosity::Quiet => LevelFilter::Off,
        Verbosity::Error => LevelFilter::Error,
        Verbosity::Warn => LevelFilter::Warn,
        Verbosity::Info => LevelFilter::Info,
        Verbosity::Debug => LevelFilter::Debug,
        Verbosity::Trace => LevelFilter::Trace,
    });

    // Install the panic hook to log panics instead of printing them to stderr.
    debug::install_panic_hook();

    let result = match cli.command {
        Command::Bisect(settings) => commands::bisect::bisect(&settings),
        Command::List(command) => commands::list::list(command),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
