// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! benchgate binary entry point.
//!
//! Exit status: 0 when the verdict is PASS, 1 on FAIL, 2 on usage or input
//! errors, 130 when interrupted.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use benchgate::cli::{Cli, Command, CompareArgs, MonitorArgs, ReportFormat, RunArgs};
use benchgate::config::TaskConfig;
use benchgate::logging;
use benchgate::pipeline::CheckpointEvent;
use benchgate::runner::{run_task, RunOptions};
use benchgate::supervisor::{LaunchSpec, Supervisor, SupervisorConfig};
use benchgate_compare::{compare, render_stream_diff, ComparisonRules, RecordStream};

const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Compare(args) => compare_files(args),
        Command::Monitor(args) => monitor(args).await,
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("benchgate: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn verdict(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let task = TaskConfig::load(&args.task)?;
    let (progress, printer) = if args.progress {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<CheckpointEvent>();
        let printer = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                eprintln!("{:>8} {}", event.state, event.name);
            }
        });
        (Some(tx), Some(printer))
    } else {
        (None, None)
    };
    let options = RunOptions {
        supervisor: args.supervisor_config(),
        artifacts: args.artifacts.clone(),
        model_id: args.model_id.clone(),
        iteration: args.iteration,
        progress,
        ..RunOptions::default()
    };

    // Dropping the run on interrupt drops its supervisor, which kills its processes
    let report = tokio::select! {
        report = run_task(task, options) => report,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("benchgate: interrupted");
            return Ok(ExitCode::from(INTERRUPTED));
        }
    };
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match args.output {
        Some(ref path) => {
            report
                .write_to(path)
                .with_context(|| format!("cannot write report to {}", path.display()))?;
            eprintln!(
                "{}: score {} / {} -> {}",
                if report.passed { "PASS" } else { "FAIL" },
                report.score,
                report.max_score,
                path.display()
            );
        }
        None => match args.format {
            ReportFormat::Json => println!("{}", report.to_json()?),
            ReportFormat::Markdown => print!("{}", report.to_markdown()),
        },
    }
    Ok(verdict(report.passed))
}

fn compare_files(args: CompareArgs) -> Result<ExitCode> {
    let task = args.task.as_deref().map(TaskConfig::load).transpose()?;

    let mut rules = task
        .as_ref()
        .map(|t| t.rules.clone())
        .unwrap_or_else(ComparisonRules::default);
    if let Some(tolerance) = args.tolerance {
        rules = rules.with_tolerance(tolerance);
    }
    if let Some(ordering) = args.ordering {
        rules = rules.with_ordering(ordering);
    }
    if args.allow_superset {
        rules = rules.with_superset(true);
    }
    for field in &args.ignore {
        rules = rules.with_ignored_field(field.clone());
    }

    let expected_path = args
        .expected
        .clone()
        .or_else(|| task.as_ref().map(TaskConfig::expected_output_path))
        .context("--expected is required when no --task is given")?;
    let expected = RecordStream::load(&expected_path, &rules.stream)?;
    let actual = RecordStream::load(&args.actual, &rules.stream)?;
    let result = compare(&actual, &expected, &rules).context("comparison input is malformed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "{}: {}",
            if result.passed { "PASS" } else { "FAIL" },
            result.summary()
        );
        for mismatch in &result.mismatches {
            println!("  {}", mismatch);
        }
    }
    if args.diff && !result.passed {
        print!("{}", render_stream_diff(&actual, &expected));
    }
    Ok(verdict(result.passed))
}

async fn monitor(args: MonitorArgs) -> Result<ExitCode> {
    let config = SupervisorConfig::default();
    let grace = config.grace_period;
    let supervisor = Supervisor::new(config);

    let mut spec = LaunchSpec::from_argv(
        args.process_name(),
        &args.command,
        Duration::from_millis(args.hang_timeout_ms),
        Duration::from_millis(args.hard_timeout_ms),
    )?;
    if let Some(ref cwd) = args.cwd {
        spec = spec.cwd(cwd);
    }
    if let Some(ref capture) = args.capture {
        spec = spec.capture_to(capture);
    }
    let handle = supervisor.launch(spec)?;

    let budget = Duration::from_millis(args.hard_timeout_ms) + grace + Duration::from_secs(2);
    let mut interrupted = false;
    let mut status = tokio::select! {
        status = supervisor.wait(handle, budget) => status?,
        _ = tokio::signal::ctrl_c() => {
            interrupted = true;
            supervisor.terminate(handle)?;
            supervisor.wait(handle, grace + Duration::from_secs(1)).await?
        }
    };
    if !status.is_terminal() {
        supervisor.terminate(handle)?;
        status = supervisor.wait(handle, grace + Duration::from_secs(1)).await?;
    }

    let snapshot = supervisor.snapshot(handle)?;
    let json = if args.show_output {
        serde_json::json!({
            "process": snapshot,
            "output": supervisor.output(handle)?,
        })
    } else {
        serde_json::to_value(&snapshot)?
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    supervisor.shutdown().await;

    if interrupted {
        return Ok(ExitCode::from(INTERRUPTED));
    }
    Ok(verdict(status.success()))
}
