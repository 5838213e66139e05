//! # Back Office Report Runner
//!
//! Prints store reports as JSON.
//!
//! ```text
//! backoffice report [FROM] [TO]     period report, dates as YYYY-MM-DD (default today)
//! backoffice low-stock [THRESHOLD]  active products at or below the threshold
//! ```

use std::process::ExitCode;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;

use mostrador_backoffice::commands::{product, report};
use mostrador_backoffice::{init_tracing, open_state};

const USAGE: &str = "\
Usage:
  backoffice report [FROM] [TO]      Period report (dates YYYY-MM-DD, default today)
  backoffice low-stock [THRESHOLD]   Products at or below the low stock threshold
  backoffice --help                  Show this message";

enum Command {
    Report(report::ReportRange),
    LowStock(Option<i64>),
    Help,
}

fn parse_date(arg: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(arg, "%Y-%m-%d").map_err(|_| format!("Invalid date: {}", arg))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        None | Some("-h") | Some("--help") | Some("help") => Ok(Command::Help),
        Some("report") => {
            let from = args.get(1).map(|a| parse_date(a)).transpose()?;
            let to = args.get(2).map(|a| parse_date(a)).transpose()?;
            // A single date reports just that day
            let to = to.or(from);
            Ok(Command::Report(report::ReportRange::new(from, to)))
        }
        Some("low-stock") => {
            let threshold = args
                .get(1)
                .map(|a| a.parse::<i64>().map_err(|_| format!("Invalid threshold: {}", a)))
                .transpose()?;
            Ok(Command::LowStock(threshold))
        }
        Some(other) => Err(format!("Unknown command: {}", other)),
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Could not serialize output");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    let state = match open_state().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let code = match command {
        Command::Report(range) => match report::period_report(&state, range).await {
            Ok(r) => print_json(&r),
            Err(e) => {
                error!(error = %e, "Report failed");
                ExitCode::FAILURE
            }
        },
        Command::LowStock(threshold) => match product::low_stock_products(&state, threshold).await {
            Ok(products) => print_json(&products),
            Err(e) => {
                error!(error = %e, "Low stock query failed");
                ExitCode::FAILURE
            }
        },
        Command::Help => ExitCode::SUCCESS,
    };

    state.db().close().await;
    code
}
