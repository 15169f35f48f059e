use std::process::ExitCode;

use dispatch_scheduler::domain::{CalendarService, format_clock};
use dispatch_scheduler::scenario::Scenario;
use dispatch_scheduler::schedule::{Direction, schedule_subgraphs};
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: dispatch-scheduler <scenario.json> [calendar-service]";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let scenario = match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!(error = %e, "Failed to load scenario");
            return ExitCode::FAILURE;
        }
    };

    let calendars = match args.next() {
        Some(calendar) => vec![CalendarService::new(calendar)],
        None => scenario.calendars(),
    };

    for calendar in &calendars {
        let timetables = match schedule_subgraphs(&scenario.routes, calendar, &scenario.config).await {
            Ok(timetables) => timetables,
            Err(e) => {
                error!(%calendar, error = %e, "Scheduling failed");
                return ExitCode::FAILURE;
            }
        };

        println!("== {calendar} ==");
        for (i, timetable) in timetables.iter().enumerate() {
            let patterns: Vec<_> = timetable.patterns.iter().map(|p| p.as_str()).collect();
            println!();
            println!("Subgraph {} ({})", i + 1, patterns.join(", "));
            for window in &timetable.windows {
                println!("  {}", window.range);
                for direction in Direction::ALL {
                    let offsets: Vec<_> = window
                        .offsets(direction)
                        .iter()
                        .map(|(id, offset)| format!("{id}+{offset}s"))
                        .collect();
                    println!("    {direction:<8} {}", offsets.join("  "));
                }
            }
            println!();
            for departure in timetable.departures() {
                println!(
                    "  {:>8}  {:<8}  {}",
                    format_clock(departure.time),
                    departure.direction,
                    departure.pattern
                );
            }
        }
        println!();
    }

    ExitCode::SUCCESS
}
