//! diagtree - hierarchical diagnostic interview state machine
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use diagtree::cli::check::{CheckCommand, CheckOptions};
use diagtree::cli::subgroups::{SubgroupsCommand, SubgroupsOptions, SubgroupsOutput};
use diagtree::cli::walk::{parse_answer, WalkCommand, WalkOptions, WalkOutput, WalkStart};
use diagtree::config::{diagtree_home, Config};
use diagtree::error::exit_codes;
use diagtree::logging::init_logging;

// =============================================================================
// CLI Definition
// =============================================================================

/// diagtree - hierarchical diagnostic interview state machine
#[derive(Parser)]
#[command(name = "diagtree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the rule tables (overrides configuration)
    #[arg(long, global = true, value_name = "DIR")]
    rules: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive one interview with scripted answers
    Walk {
        /// Start group
        #[arg(long, requires = "state", conflicts_with = "topic")]
        group: Option<String>,
        /// Start state
        #[arg(long, requires = "group")]
        state: Option<String>,
        /// Start from a topic's entry point
        #[arg(long, required_unless_present = "group")]
        topic: Option<String>,
        /// Comma-separated answers (y/n)
        #[arg(long, short, value_delimiter = ',', value_parser = parse_answer)]
        answers: Vec<bool>,
        /// Seed for subgroup shuffling
        #[arg(long)]
        seed: Option<u64>,
        /// Write the interview history to a JSON file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Load the rule tables and audit them
    Check {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List the subgroup registry
    Subgroups {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    // Set up panic handler
    setup_panic_handler();

    // Run the CLI
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("diagtree error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.diagtree/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("diagtree panic: {}", info);

        if let Some(home) = diagtree_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load();
    if let Some(dir) = cli.rules {
        config.rules.dir = dir;
    }

    match cli.command {
        Commands::Walk {
            group,
            state,
            topic,
            answers,
            seed,
            export,
            json,
            quiet,
        } => {
            let start = match (group, state, topic) {
                (Some(group), Some(state), _) => WalkStart::Position { group, state },
                (_, _, Some(topic)) => WalkStart::Topic(topic),
                _ => return Err("walk needs --group and --state, or --topic".into()),
            };
            if seed.is_some() {
                config.engine.seed = seed;
            }
            let options = WalkOptions {
                json,
                quiet,
                start,
                answers,
                export,
            };
            Ok(run_walk(&config, &options))
        }
        Commands::Check { json, quiet } => Ok(run_check(&config, json, quiet)),
        Commands::Subgroups { json, quiet } => Ok(run_subgroups(&config, json, quiet)),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn to_exit_code(success: bool, rule_error: bool) -> ExitCode {
    let code = if success {
        exit_codes::OK
    } else if rule_error {
        exit_codes::RULE_ERROR
    } else {
        exit_codes::FAILURE
    };
    ExitCode::from(code as u8)
}

fn print_unless_empty(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_walk(config: &Config, options: &WalkOptions) -> ExitCode {
    let loaded = config.rules.load_store().and_then(|rules| {
        let registry = config.registry()?;
        let catalog = config.rules.load_catalog()?;
        Ok((rules, registry, catalog))
    });

    let output = match &loaded {
        Ok((rules, registry, catalog)) => {
            let cmd = WalkCommand::new(rules, registry, catalog, config.engine.clone());
            cmd.run(options)
        }
        Err(e) => WalkOutput::failure(e),
    };

    print_unless_empty(&output.render(options));

    to_exit_code(output.success, output.rule_error)
}

fn run_check(config: &Config, json: bool, quiet: bool) -> ExitCode {
    let cmd = CheckCommand::new(config);
    let options = CheckOptions { json, quiet };

    let output = cmd.run(&options);
    print_unless_empty(&cmd.format_output(&output, &options));

    to_exit_code(output.success, output.rule_error)
}

fn run_subgroups(config: &Config, json: bool, quiet: bool) -> ExitCode {
    let options = SubgroupsOptions { json, quiet };

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            let output = SubgroupsOutput::failure(e.to_string());
            if !quiet {
                println!("{}", output.format_text());
            }
            return to_exit_code(false, e.is_rule_error());
        }
    };

    let cmd = SubgroupsCommand::new(&registry);
    let output = cmd.run(&options);
    print_unless_empty(&cmd.format_output(&output, &options));

    to_exit_code(output.success, false)
}

// =============================================================================
// Tests
// =============================================================================
