// Trip Scheduler
// Command-line front end over the scheduling core and the SQLite store

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{ArgGroup, Parser, Subcommand};
use serde_json::json;

use trip_scheduler::config::AppConfig;
use trip_scheduler::models::activity::{ActivityDraft, ActivityType};
use trip_scheduler::models::trip::{ExtendDirection, Trip, TripId, TripRange};
use trip_scheduler::services::repository::SqliteRepository;
use trip_scheduler::services::schedule::time_slots::slots_for;
use trip_scheduler::services::schedule::ScheduleOrchestrator;
use trip_scheduler::utils::date::{format_date, format_time, parse_date, parse_time};

#[derive(Parser)]
#[command(name = "trip-scheduler")]
#[command(about = "Plan the activities of a business trip day by day")]
struct Cli {
    /// SQLite database file (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Trip {
        #[command(subcommand)]
        command: TripCommand,
    },
    /// Print the itinerary of a trip with conflict annotations
    Agenda {
        #[arg(long)]
        trip: i64,
    },
    /// Add an activity to a trip
    Add {
        #[arg(long)]
        trip: i64,
        #[arg(long)]
        title: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = date_arg)]
        until: Option<NaiveDate>,
        #[arg(long, value_parser = time_arg)]
        start: Option<NaiveTime>,
        #[arg(long, value_parser = time_arg, requires = "start")]
        end: Option<NaiveTime>,
        #[arg(long = "type", value_parser = type_arg)]
        kind: Option<ActivityType>,
        #[arg(long, default_value_t = false)]
        confirmed: bool,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Add (positive) or remove (negative) days at one end of a trip
    #[command(group(ArgGroup::new("side").required(true).args(["before", "after"])))]
    Extend {
        #[arg(long)]
        trip: i64,
        #[arg(long, allow_hyphen_values = true)]
        before: Option<i64>,
        #[arg(long, allow_hyphen_values = true)]
        after: Option<i64>,
    },
    /// Print the time-slot grid for the configured calendar hours
    Slots,
}

#[derive(Subcommand)]
enum TripCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = date_arg)]
        start: NaiveDate,
        #[arg(long, value_parser = date_arg)]
        end: NaiveDate,
    },
    List,
}

fn date_arg(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD, got '{value}'"))
}

fn time_arg(value: &str) -> std::result::Result<NaiveTime, String> {
    parse_time(value).ok_or_else(|| format!("expected HH:MM, got '{value}'"))
}

fn type_arg(value: &str) -> std::result::Result<ActivityType, String> {
    ActivityType::all()
        .iter()
        .copied()
        .find(|kind| kind.as_str() == value.trim().to_ascii_lowercase())
        .ok_or_else(|| {
            let names: Vec<&str> = ActivityType::all().iter().map(|kind| kind.as_str()).collect();
            format!("expected one of {}", names.join(", "))
        })
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let db_path = match cli.db {
        Some(path) => path,
        None => config.database_path()?,
    };
    log::info!("Using database {}", db_path.display());

    let open_repo = || -> Result<SqliteRepository> {
        SqliteRepository::open(&db_path.to_string_lossy())
    };
    let open_session = |trip: i64| -> Result<ScheduleOrchestrator<SqliteRepository>> {
        let repo = open_repo()?;
        let trip = repo.trip(TripId(trip))?;
        let mut session = ScheduleOrchestrator::new(repo, &trip, config.calendar.clone())?;
        session.load().context("Failed to load activities")?;
        Ok(session)
    };

    match cli.command {
        Commands::Trip {
            command: TripCommand::Create { name, start, end },
        } => {
            let trip = Trip::new(name, TripRange::new(start, end)?)?;
            let created = open_repo()?.create_trip(&trip)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                let id = created.id.map(|id| id.to_string()).unwrap_or_default();
                println!("Created trip {} '{}' ({})", id, created.name, created.range);
            }
        }
        Commands::Trip {
            command: TripCommand::List,
        } => {
            let trips = open_repo()?.trips().list()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&trips)?);
            } else {
                for trip in trips {
                    let id = trip.id.map(|id| id.to_string()).unwrap_or_default();
                    println!("{:>4}  {}  {}", id, trip.range, trip.name);
                }
            }
        }
        Commands::Agenda { trip } => {
            let session = open_session(trip)?;
            print_agenda(&session, cli.json)?;
        }
        Commands::Add {
            trip,
            title,
            date,
            until,
            start,
            end,
            kind,
            confirmed,
            location,
            host,
            notes,
        } => {
            let mut draft = ActivityDraft::new(title).on(date).confirmed(confirmed);
            draft.end_date = until;
            draft.activity_type = kind;
            if let Some(start) = start {
                draft = draft.at(start, end);
            }
            draft.location = location;
            draft.host = host;
            draft.notes = notes;

            let mut session = open_session(trip)?;
            let created = session.create_activity(draft)?;
            let warnings: Vec<_> = session
                .conflict_warnings_on(created.activity_date)
                .into_iter()
                .filter(|warning| Some(warning.activity_id) == created.id)
                .collect();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({
                    "activity": created,
                    "conflicts": warnings,
                }))?);
            } else {
                let id = created.id.map(|id| id.to_string()).unwrap_or_default();
                println!("Added activity {} '{}' on {}", id, created.title, created.activity_date);
                for warning in warnings {
                    println!("  ! {}", warning.description);
                }
            }
        }
        Commands::Extend { trip, before, after } => {
            let (direction, days) = match (before, after) {
                (Some(days), _) => (ExtendDirection::Before, days),
                (None, Some(days)) => (ExtendDirection::After, days),
                (None, None) => anyhow::bail!("one of --before or --after is required"),
            };

            let mut session = open_session(trip)?;
            let preview = session.preview_extend(direction, days)?;
            if preview.deletes_confirmed() {
                log::warn!("Range change deletes confirmed activities");
            }
            let change = session.extend_trip(direction, days)?;

            let deleted: Vec<_> = change
                .deleted
                .iter()
                .map(|deleted| json!({ "id": deleted.id, "title": deleted.title, "confirmed": deleted.is_confirmed }))
                .collect();
            let clamped: Vec<_> = change
                .clamped
                .iter()
                .map(|clamped| {
                    json!({
                        "id": clamped.id,
                        "activity_date": format_date(clamped.activity_date),
                        "end_date": format_date(clamped.end_date),
                    })
                })
                .collect();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&json!({
                    "previous": change.previous,
                    "range": change.range,
                    "deleted": deleted,
                    "clamped": clamped,
                }))?);
            } else {
                println!("Trip {} now runs {}", trip, change.range);
                for deleted in &change.deleted {
                    println!("  deleted '{}'", deleted.title);
                }
                for clamped in &change.clamped {
                    let id = clamped.id.map(|id| id.to_string()).unwrap_or_default();
                    println!(
                        "  clamped activity {} to {} .. {}",
                        id, clamped.activity_date, clamped.end_date
                    );
                }
            }
        }
        Commands::Slots => {
            let slots = slots_for(&config.calendar);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&slots)?);
            } else {
                println!("{}", slots.join("\n"));
            }
        }
    }

    Ok(())
}

fn print_agenda(session: &ScheduleOrchestrator<SqliteRepository>, as_json: bool) -> Result<()> {
    let days = session.itinerary();

    if as_json {
        let conflicts: Vec<_> = days
            .iter()
            .flat_map(|day| session.conflict_warnings_on(day.date))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "trip_id": session.trip_id(),
                "range": session.range(),
                "days": days,
                "stats": session.get_activity_stats(),
                "conflicts": conflicts,
            }))?
        );
        return Ok(());
    }

    let stats = session.get_activity_stats();
    println!(
        "Trip {} ({}): {} activities, {} meetings, {} visits, {} confirmed",
        session.trip_id(),
        session.range(),
        stats.total,
        stats.meetings,
        stats.visits,
        stats.confirmed
    );

    for day in days {
        println!();
        println!("{}  {}", day.title, day.date.format("%a %Y-%m-%d"));
        if day.activities.is_empty() {
            println!("  (nothing planned)");
            continue;
        }

        let warnings = session.conflict_warnings_on(day.date);
        for activity in &day.activities {
            let governs = activity.activity_date == day.date;
            let time = match (activity.start_time.filter(|_| governs), activity.end_time.filter(|_| governs)) {
                (Some(start), Some(end)) => format!("{}-{}", format_time(start), format_time(end)),
                (Some(start), None) => format!("{}      ", format_time(start)),
                _ => "all day    ".to_string(),
            };
            let mark = if activity.is_confirmed { "*" } else { " " };
            println!("  {} {} {} [{}]", time, mark, activity.title, activity.activity_type);

            for warning in warnings
                .iter()
                .filter(|warning| Some(warning.activity_id) == activity.id)
            {
                println!("      ! {} ({})", warning.description, warning.suggested_resolution);
            }
        }
    }

    Ok(())
}
