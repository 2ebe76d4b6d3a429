// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI tool to run all marshaling benchmarks and write the reports.

use std::path::PathBuf;

use clap::Parser;
use marshalbench_benchmark::{
    build_catalog, pin_to_cpu, BenchmarkReport, BenchmarkRunner, CycleClock, JsonReporter,
    ReportBuilder, Tier,
};
use marshalbench_core::{Config, ConfigLoader, OuterRounds};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "run_benchmarks")]
#[command(about = "Compare marshaling strategies across a C ABI boundary")]
struct Args {
    /// YAML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of outer rounds
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Text result file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a JSON summary to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Run in quick mode (10 outer rounds, inner loops cut by 10)
    #[arg(long)]
    quick: bool,

    /// Pin the runner thread to this CPU
    #[arg(long)]
    pin_cpu: Option<usize>,

    /// List discovered benchmarks and exit
    #[arg(long)]
    list: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;

    let catalog = build_catalog(&config.strategies)?;
    if args.list {
        for descriptor in catalog.iter() {
            let category = descriptor.category().map_or("-", |c| c.as_str());
            println!(
                "{:<9} {:<28} {}",
                Tier::from(descriptor.is_primary()),
                category,
                descriptor.name()
            );
        }
        return Ok(());
    }

    if let Some(cpu) = args.pin_cpu {
        if let Err(e) = pin_to_cpu(cpu) {
            warn!(error = %e, "Running unpinned");
        }
    }
    if !CycleClock::is_hardware() {
        warn!("No hardware cycle counter on this target, timings are in nanoseconds");
    }

    let runner = BenchmarkRunner::new().configure(&config.runner);
    let mut records = runner.run(catalog)?;

    let report = ReportBuilder::render(&mut records);
    print!("{}", report.primary());

    let result_file = &config.runner.result_file;
    println!(
        "Writing more performance test results to: {}",
        result_file.display()
    );

    let mut write_failed = false;
    if let Err(e) = report.write_to(result_file) {
        error!(error = %e, "Failed to write result file");
        write_failed = true;
    }

    if let Some(json_path) = &config.runner.json_summary {
        let summary = BenchmarkReport::from_records(&mut records, config.runner.outer_rounds.get());
        match JsonReporter::new(json_path).save(&summary) {
            Ok(path) => info!(path = %path.display(), "JSON summary saved"),
            Err(e) => {
                error!(error = %e, "Failed to write JSON summary");
                write_failed = true;
            }
        }
    }

    if write_failed {
        anyhow::bail!("one or more reports could not be written");
    }
    Ok(())
}

/// Load the configuration and apply command-line overrides.
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_file(path)?,
        None => Config::default(),
    };

    if args.quick {
        config.runner.outer_rounds = OuterRounds::new(10)?;
        config.strategies = config.strategies.scaled_down(10);
    }
    if let Some(rounds) = args.rounds {
        config.runner.outer_rounds = OuterRounds::new(rounds)?;
    }
    if let Some(output) = &args.output {
        config.runner.result_file = output.clone();
    }
    if let Some(json) = &args.json {
        config.runner.json_summary = Some(json.clone());
    }

    info!(
        outer_rounds = config.runner.outer_rounds.get(),
        primary_inner_rounds = config.strategies.primary_inner_rounds,
        boundary_inner_rounds = config.strategies.boundary_inner_rounds,
        "Configuration loaded"
    );
    Ok(config)
}
