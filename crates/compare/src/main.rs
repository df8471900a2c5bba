// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Compare an actual JSONL record file against a reference file.
//!
//! Exit status: 0 when the streams match, 1 on mismatch, 2 on input errors.

use anyhow::{Context, Result};
use benchgate_compare::{compare, render_stream_diff, ComparisonRules, OrderingMode, RecordStream};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "benchgate-compare",
    about = "Compare line-delimited JSON records with tolerance rules"
)]
struct Args {
    /// Reference (expected) JSONL file
    #[arg(long)]
    expected: PathBuf,

    /// Actual JSONL file to verify
    #[arg(long)]
    actual: PathBuf,

    /// Absolute tolerance for float fields
    #[arg(long, default_value_t = benchgate_compare::DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// strict, by-sequence or unordered
    #[arg(long, default_value = "strict")]
    ordering: OrderingMode,

    /// Field path never compared (repeatable)
    #[arg(long = "ignore")]
    ignore: Vec<String>,

    /// Only compare these field paths (repeatable)
    #[arg(long = "require")]
    require: Vec<String>,

    /// Accept extra actual records
    #[arg(long)]
    allow_superset: bool,

    /// Compare ints and floats numerically
    #[arg(long)]
    lenient_numbers: bool,

    /// Number of mismatches to report
    #[arg(long, default_value_t = benchgate_compare::DEFAULT_MAX_DIFFS)]
    max_diffs: usize,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Print a unified diff of the two streams on failure
    #[arg(long)]
    diff: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("benchgate-compare: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> Result<bool> {
    let mut rules = ComparisonRules::default()
        .with_tolerance(args.tolerance)
        .with_ordering(args.ordering)
        .with_superset(args.allow_superset)
        .with_lenient_numbers(args.lenient_numbers)
        .with_max_diffs(args.max_diffs);
    for field in &args.ignore {
        rules = rules.with_ignored_field(field.clone());
    }
    if !args.require.is_empty() {
        rules = rules.with_required_fields(args.require.iter().cloned());
    }

    let expected = RecordStream::load(&args.expected, &rules.stream)?;
    let actual = RecordStream::load(&args.actual, &rules.stream)?;
    let result = compare(&actual, &expected, &rules).context("comparison input is malformed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let verdict = if result.passed { "PASS" } else { "FAIL" };
        println!("{}: {}", verdict, result.summary());
        for mismatch in &result.mismatches {
            println!("  {}", mismatch);
        }
        if result.total_mismatches > result.mismatches.len() {
            println!(
                "  ... {} more mismatch(es)",
                result.total_mismatches - result.mismatches.len()
            );
        }
    }

    if args.diff && !result.passed {
        print!("{}", render_stream_diff(&actual, &expected));
    }

    Ok(result.passed)
}
