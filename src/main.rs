use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use miette::Report;

use lc3vm::{Fault, RunState, Status, TerminalConsole, INTERRUPT_CHECK_INTERVAL};

/// Exit status when no image is given.
const NO_IMAGE_EXIT: i32 = 1;
/// Exit status when an image cannot be loaded.
const LOAD_FAILURE_EXIT: i32 = 2;
/// Exit status when the program calls an unknown trap.
const UNKNOWN_TRAP_EXIT: i32 = 3;

/// lc3vm runs binary LC3 program images.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.obj` images (or glob patterns) to load in order; later images overwrite earlier ones
    images: Vec<String>,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// What to do when the program calls a trap vector with no routine
    #[arg(long, value_enum, env = "LC3VM_UNKNOWN_TRAP", default_value_t = UnknownTrap::Fail)]
    unknown_trap: UnknownTrap,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum UnknownTrap {
    /// Stop the machine with an error
    Fail,
    /// Skip the trap and continue
    Ignore,
}

fn main() -> miette::Result<()> {
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().build())
    }))?;

    if args.images.is_empty() {
        eprintln!("{:>12} no image file provided", "Error".red());
        eprintln!("{:>12} lc3vm [IMAGES]...", "Usage".cyan());
        std::process::exit(NO_IMAGE_EXIT);
    }

    let mut state = RunState::new(TerminalConsole::new());
    state.set_ignore_unknown_traps(args.unknown_trap == UnknownTrap::Ignore);

    for path in expand_paths(&args.images) {
        if !args.minimal {
            file_message("Loading", &path);
        }
        if let Err(e) = state.load_file(&path) {
            eprintln!("{:?}", Report::new(e));
            std::process::exit(LOAD_FAILURE_EXIT);
        }
    }

    if !args.minimal {
        message("Running", "loaded images");
    }
    state.console_mut().attach();
    let result = execute(&mut state);
    // Restore terminal before reporting anything
    drop(state);

    match result {
        Ok(()) => Ok(()),
        Err(fault @ Fault::UnknownTrap { .. }) => {
            eprintln!("{:?}", Report::new(fault));
            std::process::exit(UNKNOWN_TRAP_EXIT);
        }
        Err(fault @ Fault::ReservedOpcode { .. }) => {
            eprintln!("{:?}", Report::new(fault));
            std::process::abort();
        }
    }
}

/// Run to completion, draining terminal events every so often so `Ctrl+C` is honoured by
/// programs that never read the keyboard.
fn execute(state: &mut RunState<TerminalConsole>) -> Result<(), Fault> {
    let mut steps = 0usize;
    while state.step()? == Status::Running {
        steps = steps.wrapping_add(1);
        if steps % INTERRUPT_CHECK_INTERVAL == 0 {
            state.console_mut().pump();
        }
    }
    Ok(())
}

/// Expand each argument as a glob pattern. Patterns matching nothing are kept as literal
/// paths, so missing files still fail to load.
fn expand_paths(patterns: &[String]) -> Vec<PathBuf> {
    patterns
        .iter()
        .flat_map(|pattern| {
            let mut matches: Vec<PathBuf> = glob::glob(pattern)
                .map(|paths| paths.filter_map(Result::ok).collect())
                .unwrap_or_default();
            if matches.is_empty() {
                matches.push(PathBuf::from(pattern));
            }
            matches
        })
        .collect()
}

fn file_message(left: &str, right: &PathBuf) {
    let right = format!("target {}", right.display());
    message(left, &right);
}

fn message(left: &str, right: &str) {
    println!("{:>12} {right}", left.green());
}
