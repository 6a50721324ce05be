use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};

use ridelog_lib::{
    db::Database,
    format::{format_date, format_distance, format_duration, format_speed},
    location::{is_outside_correction_zone, wgs84_to_gcj02},
    models::{SessionSummary, Wgs84Position},
    replay,
    session::{FitnessRecordSink, WorkoutEntry},
    settings::{SettingsStore, TrackerSettings},
};

const DEFAULT_DB_PATH: &str = "ridelog.sqlite3";

#[derive(Parser)]
#[command(name = "ridelog")]
#[command(about = "Record, replay and inspect cycling sessions", long_about = None)]
struct Cli {
    /// Settings file; defaults apply when it is missing
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines event file and print the resulting summaries
    Replay {
        file: PathBuf,
        /// Persist summaries and fitness records to this database
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// List stored sessions, newest first
    List {
        #[arg(long, default_value = DEFAULT_DB_PATH)]
        db: PathBuf,
    },
    /// Print the display-frame position for a raw coordinate
    Convert {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    ridelog_lib::init_logging();
    let cli = Cli::parse();

    let settings = load_settings(cli.settings)?;

    match cli.command {
        Commands::Replay { file, db } => replay_file(file, db, &settings).await,
        Commands::List { db } => list_sessions(db).await,
        Commands::Convert {
            latitude,
            longitude,
        } => {
            let raw = Wgs84Position::new(latitude, longitude);
            let converted = wgs84_to_gcj02(raw);
            if is_outside_correction_zone(raw) {
                info!("position is outside the correction zone; passing through");
            }
            println!("{:.9}\t{:.9}", converted.latitude, converted.longitude);
            Ok(())
        }
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<TrackerSettings> {
    let settings = match path {
        Some(path) => SettingsStore::new(path)?.settings(),
        None => TrackerSettings::default(),
    };
    Ok(settings.with_env_overrides())
}

async fn replay_file(file: PathBuf, db: Option<PathBuf>, settings: &TrackerSettings) -> Result<()> {
    let events = replay::load_events(&file)?;
    let outcome = replay::run(&events, settings);

    for summary in &outcome.summaries {
        print_summary(summary);
    }
    if outcome.summaries.is_empty() {
        println!(
            "no session finished (final state {:?}, {})",
            outcome.final_state,
            format_duration(outcome.snapshot.metrics.workout_time)
        );
    }

    let Some(path) = db else {
        return Ok(());
    };
    let database = Database::new(path).context("failed to open session database")?;
    for summary in &outcome.summaries {
        database.save_summary(summary).await?;

        let entry = WorkoutEntry::from(summary);
        if let Err(err) = database
            .save_workout(entry.distance_m, entry.duration, entry.start_date, entry.end_date)
            .await
        {
            error!("failed to save workout record: {err:#}");
        }
        if let Err(err) = database.save_distance(entry.distance_m, entry.end_date).await {
            error!("failed to save distance record: {err:#}");
        }
    }
    info!(
        "stored {} session(s) in {}",
        outcome.summaries.len(),
        database.path().display()
    );
    Ok(())
}

async fn list_sessions(path: PathBuf) -> Result<()> {
    let database = Database::new(path).context("failed to open session database")?;
    let sessions = database.list_summaries().await?;
    if sessions.is_empty() {
        println!("no sessions stored");
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{} segment(s)",
            session.id,
            format_date(&session.date),
            format_duration(session.total_duration),
            format_distance(session.total_distance),
            format_speed(session.average_speed),
            session.segment_count
        );
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!("session {} ({})", summary.id, format_date(&summary.date));
    println!("  duration   {}", format_duration(summary.total_duration));
    println!("  distance   {}", format_distance(summary.total_distance));
    println!("  avg speed  {}", format_speed(summary.average_speed));
    println!("  avg hr     {} bpm", summary.average_heart_rate);
    println!("  calories   {:.1} kcal", summary.total_calories);
    println!("  route      {} point(s)", summary.route_coordinates.len());
    for (index, segment) in summary.segments.iter().rev().enumerate() {
        println!(
            "  segment {}: {} {} {}",
            index + 1,
            format_duration(segment.duration),
            format_distance(segment.distance),
            format_speed(segment.average_speed)
        );
    }
}
