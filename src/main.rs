use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

mod cohort;
mod engine;
mod error;
mod loader;
mod models;
mod periods;
mod report;

use models::{AnalysisContext, CohortSettings, DateRange, EventLog, Mode, ALL_SEGMENTS};
use periods::Granularity;

#[derive(Parser)]
#[command(name = "cohort-retention")]
#[command(about = "Cohort retention and churn analysis over customer event logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Event CSV with columns customer_id, date, event_type and optionally segment
    #[arg(long)]
    csv: PathBuf,
    /// Event type whose earliest occurrence anchors a customer to a cohort
    #[arg(long)]
    basis: String,
    /// Event type that counts a customer as retained in a period
    #[arg(long)]
    retention_event: String,
    #[arg(long, value_enum)]
    granularity: Granularity,
    #[arg(long, value_enum, default_value_t = Mode::Retention)]
    mode: Mode,
    /// Start of the basis-event window; defaults to the earliest event date
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End of the basis-event window; defaults to the latest event date
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Segment labels to analyze (defaults to every observed segment, or All).
    /// Dashboards usually stay readable up to about 5; no hard limit here.
    #[arg(long, value_delimiter = ',')]
    segments: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile an event CSV: record counts, date span, event types, segments
    Inspect {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the retention table
    Analyze {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Write output here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn build_context<'a>(events: &'a EventLog, run: &RunArgs) -> anyhow::Result<AnalysisContext<'a>> {
    let span = events
        .date_span()
        .context("input contains no events")?;
    let start = run.start.unwrap_or(span.0);
    let end = run.end.unwrap_or(span.1);
    let date_range = DateRange::new(start, end)?;

    let segments = if run.segments.is_empty() {
        let observed = events.segments();
        if observed.is_empty() {
            vec![ALL_SEGMENTS.to_string()]
        } else {
            observed
        }
    } else {
        run.segments.clone()
    };

    let settings = CohortSettings {
        basis_event_type: run.basis.clone(),
        granularity: run.granularity,
        retention_event_type: run.retention_event.clone(),
        mode: run.mode,
    };

    Ok(AnalysisContext::new(events, settings, date_range, segments)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { csv } => {
            let events = loader::load_events(&csv)?;
            if events.is_empty() {
                println!("No events found in {}.", csv.display());
                return Ok(());
            }
            println!("Records: {}", events.len());
            println!("Customers: {}", events.customer_count());
            match events.date_span() {
                Some((start, end)) => println!("Date range: {start} to {end}"),
                None => println!("Date range: (no events)"),
            }
            println!("Event types: {}", events.event_types().join(", "));
            let segments = events.segments();
            if segments.is_empty() {
                println!("Segments: none (runs will use the implicit All segment)");
            } else {
                println!("Segments: {}", segments.join(", "));
            }
        }
        Commands::Analyze { run, format, out } => {
            let events = loader::load_events(&run.csv)?;
            let ctx = build_context(&events, &run)?;
            let table = engine::run_analysis(&ctx)?;

            if table.is_empty() {
                println!("No cohorts with data in this window. Not enough data to analyze.");
                return Ok(());
            }

            let rendered = match format {
                OutputFormat::Table => report::render_table(&table),
                OutputFormat::Csv => report::to_csv(&table)?,
                OutputFormat::Json => report::to_json(&table)?,
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Wrote {} rows to {}.", table.len(), path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Report { run, out } => {
            let events = loader::load_events(&run.csv)?;
            let ctx = build_context(&events, &run)?;
            let table = engine::run_analysis(&ctx)?;
            let report = report::build_report(&ctx, &table);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
