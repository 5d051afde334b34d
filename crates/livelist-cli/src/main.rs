//! Livelist scenario runner CLI.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use livelist_cli::commands::{CheckReport, check_file, ensure_passed, run_file};
use livelist_cli::logging::{LogConfig, init_logging};
use livelist_cli::render::{event_log, print_check, print_run, to_json};

mod cli;

use crate::cli::{CheckArgs, Cli, Command, LogLevelArg, RunArgs};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(args),
    };
    let exit_code = match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(args: &RunArgs) -> Result<()> {
    let report = run_file(&args.scenario, args.verify)?;
    if args.json {
        println!("{}", to_json(&report).context("serialize report")?);
    } else if args.plain {
        println!("{}", event_log(&report));
    } else {
        print_run(&report);
    }
    Ok(())
}

fn check(args: &CheckArgs) -> Result<()> {
    let reports = args
        .scenarios
        .iter()
        .map(|path| check_file(path))
        .collect::<Result<Vec<CheckReport>>>()?;
    if args.json {
        println!("{}", to_json(&reports).context("serialize reports")?);
    } else {
        for report in &reports {
            print_check(report);
        }
    }
    reports.iter().try_for_each(ensure_passed)
}

/// Explicit flags beat `RUST_LOG`, which beats the default level.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let explicit = cli.verbosity.is_present() || cli.log_level.is_some();
    let level_filter = cli
        .log_level
        .map_or_else(|| cli.verbosity.tracing_level_filter(), LogLevelArg::filter);
    let with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    LogConfig {
        level_filter,
        use_env_filter: !explicit,
        ..LogConfig::default()
    }
    .with_format(cli.log_format.into())
    .with_ansi(with_ansi)
    .with_log_file(cli.log_file.clone())
}
