//! Occupancy and income reports from a spreadsheet of bookings

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use booking_report::{AppConfig, Period, ReportError};

#[derive(Parser, Debug)]
#[command(
    name = "booking-report",
    version,
    about = "Build monthly occupancy and income reports from a bookings spreadsheet"
)]
struct Cli {
    /// Bookings spreadsheet to analyse
    #[arg(default_value = "Для Анализа.xlsx")]
    input: PathBuf,

    /// Report file to create
    #[arg(short, long, default_value = "Список Бронирований.xlsx")]
    output: PathBuf,

    /// TOML file with column names and commission rates
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Month to summarise, as YYYY-MM (defaults to the current month)
    #[arg(long)]
    period: Option<Period>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// 2 when the input itself is bad (columns or amounts), 1 for anything else
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ReportError>() {
        Some(report_err) if report_err.is_validation() => 2,
        _ => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => AppConfig::default(),
    };
    let period = cli.period.unwrap_or_else(Period::current);

    let summary = booking_report::run(&config, &cli.input, &cli.output, period).with_context(|| {
        format!(
            "Failed to build report from {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    println!(
        "Kept {} of {} bookings ({} with invalid dates, {} with non-positive stays)",
        summary.rows_kept,
        summary.rows_loaded,
        summary.dropped_invalid_dates,
        summary.dropped_non_positive
    );
    println!("{} properties with arrivals in {}", summary.summary_rows, period);
    for sheet in &summary.sheets_written {
        println!("Saved: {}", sheet);
    }
    println!("Report written to {}", cli.output.display());

    Ok(())
}
