//! xersched CLI - XER schedule reprojection and CPM analysis
//!
//! Three commands over a Primavera-style XER export: reproject the schedule
//! to a target data date, run the total-float CPM engine and emit a report
//! bundle, or compare the schedule state across a window of two dates.
//!
//! Exit codes: 0 success, 1 input-file error, 2 schema/validation error,
//! 3 scheduling error (cycles, or conflicts under `--strict-conflicts`).

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use xersched_core::{DiagCode, Diagnostic, XerError};
use xersched_parser::{parse_file, write_file, ParseOutcome};
use xersched_solver::{
    build_progress_report, build_schedule_report, build_window_report, CycleRepair,
    ScheduleContext, SchedulerOptions, WindowOptions,
};

#[derive(Parser)]
#[command(name = "xersched")]
#[command(author, version, about = "XER schedule reprojection and CPM analysis", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reproject a schedule to a target data date and write the result
    Reproject {
        /// Input XER file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Target data date (YYYY-MM-DD)
        #[arg(short, long, value_name = "DATE")]
        date: String,

        /// Hours per workday for duration conversion
        #[arg(long, default_value = "8", value_name = "N")]
        hours_per_day: f64,

        /// Output directory
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Reproject, run CPM, and emit a report bundle
    Schedule {
        /// Input XER file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Data date to schedule as of (defaults to the file's data date)
        #[arg(short, long, value_name = "DATE")]
        date: Option<String>,

        /// Hours per workday for duration conversion
        #[arg(long, default_value = "8", value_name = "N")]
        hours_per_day: f64,

        /// Total-float threshold for the critical path
        #[arg(long, default_value = "0", value_name = "DAYS")]
        float_threshold: i64,

        /// Repair cycles by removing the longest-duration edge instead of
        /// refusing to schedule
        #[arg(long)]
        break_cycles: bool,

        /// Treat constraint conflicts as fatal
        #[arg(long)]
        strict_conflicts: bool,

        /// Output directory
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Compare the schedule state at two successive data dates
    Window {
        /// Input XER file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Window start date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        start: String,

        /// Window end date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        end: String,

        /// File with one monitored task code per line
        #[arg(long, value_name = "FILE")]
        monitored: Option<PathBuf>,

        /// Hours per workday for duration conversion
        #[arg(long, default_value = "8", value_name = "N")]
        hours_per_day: f64,

        /// Total-float threshold for the critical path
        #[arg(long, default_value = "0", value_name = "DAYS")]
        float_threshold: i64,

        /// Output directory
        #[arg(short, long, default_value = ".", value_name = "DIR")]
        output_dir: PathBuf,
    },
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    }
}

fn run(command: Commands) -> Result<process::ExitCode> {
    match command {
        Commands::Reproject {
            file,
            date,
            hours_per_day,
            output_dir,
        } => cmd_reproject(&file, &date, hours_per_day, &output_dir),
        Commands::Schedule {
            file,
            date,
            hours_per_day,
            float_threshold,
            break_cycles,
            strict_conflicts,
            output_dir,
        } => cmd_schedule(
            &file,
            date.as_deref(),
            hours_per_day,
            float_threshold,
            break_cycles,
            strict_conflicts,
            &output_dir,
        ),
        Commands::Window {
            file,
            start,
            end,
            monitored,
            hours_per_day,
            float_threshold,
            output_dir,
        } => cmd_window(
            &file,
            &start,
            &end,
            monitored.as_deref(),
            hours_per_day,
            float_threshold,
            &output_dir,
        ),
    }
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

/// Map the error chain onto the documented exit codes.
fn exit_code_for(err: &anyhow::Error) -> process::ExitCode {
    for cause in err.chain() {
        if let Some(xer) = cause.downcast_ref::<XerError>() {
            let code = match xer {
                XerError::Io(_) | XerError::MalformedFile(_) => 1,
                XerError::SchemaViolation(_) | XerError::InvalidWindow(_, _) => 2,
                XerError::CycleDetected(_) => 3,
            };
            return process::ExitCode::from(code);
        }
        if cause.downcast_ref::<chrono::ParseError>().is_some() {
            return process::ExitCode::from(2);
        }
    }
    process::ExitCode::from(1)
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("invalid date {:?}, expected YYYY-MM-DD", text))
}

fn load(file: &Path) -> Result<ParseOutcome> {
    let outcome =
        parse_file(file).with_context(|| format!("failed to load '{}'", file.display()))?;
    print_diagnostics(&outcome.diagnostics);
    Ok(outcome)
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn write_json(value: &impl serde::Serialize, path: &Path) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialise report")?;
    std::fs::write(path, text)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn cmd_reproject(
    file: &Path,
    date: &str,
    hours_per_day: f64,
    output_dir: &Path,
) -> Result<process::ExitCode> {
    let target = parse_date(date)?;
    let outcome = load(file)?;
    let context = ScheduleContext::new(outcome.document);

    let (snapshot, diagnostics) = context.reproject(target, hours_per_day);
    print_diagnostics(&diagnostics);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create '{}'", output_dir.display()))?;
    let output = output_dir.join(format!("{}_reprojected.xer", target));
    write_file(snapshot.document(), &output)
        .with_context(|| format!("failed to write '{}'", output.display()))?;
    println!("wrote {}", output.display());
    Ok(process::ExitCode::SUCCESS)
}

fn cmd_schedule(
    file: &Path,
    date: Option<&str>,
    hours_per_day: f64,
    float_threshold: i64,
    break_cycles: bool,
    strict_conflicts: bool,
    output_dir: &Path,
) -> Result<process::ExitCode> {
    let outcome = load(file)?;
    let context = ScheduleContext::new(outcome.document);

    let target = match date {
        Some(text) => parse_date(text)?,
        None => context
            .document()
            .data_date()
            .context("file has no data date and none was supplied")?,
    };

    let (snapshot, diagnostics) = context.reproject(target, hours_per_day);
    print_diagnostics(&diagnostics);

    let options = SchedulerOptions {
        hours_per_workday: hours_per_day,
        float_threshold,
        cycle_repair: if break_cycles {
            CycleRepair::BreakLongestEdge
        } else {
            CycleRepair::Refuse
        },
    };
    let results = snapshot.schedule(options)?;
    print_diagnostics(&results.diagnostics);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create '{}'", output_dir.display()))?;
    let schedule_report = build_schedule_report(snapshot.document(), &results);
    write_json(&schedule_report, &output_dir.join("schedule_report.json"))?;
    let progress_report = build_progress_report(snapshot.document(), hours_per_day);
    write_json(&progress_report, &output_dir.join("progress_report.json"))?;

    println!("data date: {target}");
    if let Some(finish) = results.project_finish {
        println!("project finish: {finish}");
    }
    println!("critical path ({} activities):", results.critical_path.len());
    for task_id in &results.critical_path {
        let code = snapshot
            .document()
            .activity(task_id)
            .map(|a| a.task_code.as_str())
            .unwrap_or(task_id.as_str());
        println!("  {code}");
    }

    let conflicts = results
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagCode::ConstraintConflict)
        .count();
    if strict_conflicts && conflicts > 0 {
        eprintln!("error: {} constraint conflict(s) with --strict-conflicts", conflicts);
        return Ok(process::ExitCode::from(3));
    }
    Ok(process::ExitCode::SUCCESS)
}

fn cmd_window(
    file: &Path,
    start: &str,
    end: &str,
    monitored: Option<&Path>,
    hours_per_day: f64,
    float_threshold: i64,
    output_dir: &Path,
) -> Result<process::ExitCode> {
    let window_start = parse_date(start)?;
    let window_end = parse_date(end)?;
    let monitored = match monitored {
        Some(path) => read_monitored(path)?,
        None => Vec::new(),
    };

    let outcome = load(file)?;
    let context = ScheduleContext::new(outcome.document);

    let options = WindowOptions {
        scheduler: SchedulerOptions {
            hours_per_workday: hours_per_day,
            float_threshold,
            cycle_repair: CycleRepair::Refuse,
        },
        monitored,
    };
    let comparison = context.window(window_start, window_end, options)?;
    print_diagnostics(&comparison.diagnostics);

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create '{}'", output_dir.display()))?;
    let open_path = output_dir.join(format!("{}_start_window.xer", window_start));
    write_file(&comparison.open.document, &open_path)
        .with_context(|| format!("failed to write '{}'", open_path.display()))?;
    println!("wrote {}", open_path.display());
    let close_path = output_dir.join(format!("{}_end_window.xer", window_end));
    write_file(&comparison.close.document, &close_path)
        .with_context(|| format!("failed to write '{}'", close_path.display()))?;
    println!("wrote {}", close_path.display());

    let report = build_window_report(&comparison);
    write_json(&report, &output_dir.join("window_report.json"))?;

    println!(
        "window {} .. {}: {} removed from critical path, {} added",
        window_start,
        window_end,
        comparison.critical_comparison.removed.len(),
        comparison.critical_comparison.added.len()
    );
    Ok(process::ExitCode::SUCCESS)
}

/// One task code per line; blank lines and `#` comments are skipped.
fn read_monitored(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
