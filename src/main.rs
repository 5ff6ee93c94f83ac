use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use uuid::Uuid;

use liftrs::config::AppConfig;
use liftrs::database::Database;
use liftrs::logging::{init_logging, LogLevel};
use liftrs::models::{ChainIdentity, Difficulty, ExerciseInstance, ExerciseSet};
use liftrs::orchestrator::{IncrementPropagator, ProgressionOrchestrator, ProgressionOutcome};
use liftrs::locator::NextInstanceLocator;
use liftrs::reps::RepsRange;
use liftrs::store::InstanceStore;

/// liftrs - Progressive Overload Engine
///
/// Tracks per-exercise workout sessions and precomputes the weight/reps/sets
/// the same exercise should target the next time it appears in the program.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Progressive overload tracking CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a program enrollment from a JSON file
    Import {
        /// Program JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Log one executed set for an exercise instance
    LogSet {
        /// Exercise instance id
        #[arg(short, long)]
        instance: String,

        /// Set number within the instance (starting at 1)
        #[arg(short, long)]
        set: u32,

        /// Repetitions executed
        #[arg(short, long)]
        reps: u32,

        /// Weight used
        #[arg(short, long)]
        weight: Option<Decimal>,
    },

    /// Complete an exercise with feedback and precompute the next session
    Complete {
        /// Exercise instance id
        #[arg(short, long)]
        instance: String,

        /// Difficulty rating (very_easy, easy, moderate, hard, very_hard)
        #[arg(short, long)]
        difficulty: String,

        /// Fatigue rating (1-5)
        #[arg(short, long)]
        fatigue: u8,

        /// Pain rating (1-5)
        #[arg(short, long)]
        pain: Option<u8>,
    },

    /// Set the minimum equipment increment for an exercise chain
    SetIncrement {
        /// Exercise instance id (any instance of the chain)
        #[arg(short, long)]
        instance: String,

        /// Increment value
        #[arg(short, long)]
        value: Decimal,
    },

    /// Show the next pending occurrence of an instance's exercise chain
    Next {
        /// Exercise instance id
        #[arg(short, long)]
        instance: String,
    },

    /// Show all exercise instances of an enrollment
    Show {
        /// Program enrollment id
        #[arg(short, long)]
        enrollment: String,
    },
}

/// Program enrollment import format
#[derive(Debug, Deserialize)]
struct ProgramFile {
    enrollment_id: Option<String>,
    program_name: String,
    workouts: Vec<WorkoutDef>,
}

#[derive(Debug, Deserialize)]
struct WorkoutDef {
    id: Option<String>,
    name: String,
    exercises: Vec<ExerciseDef>,
}

#[derive(Debug, Deserialize)]
struct ExerciseDef {
    id: Option<String>,
    name: String,
    muscle_group: Option<String>,
    original_exercise_id: Option<String>,
    custom_substitute_id: Option<String>,
    #[serde(default = "default_sets")]
    sets: u32,
    weight: Option<Decimal>,
    programmed_reps: String,
    min_increment: Option<Decimal>,
}

fn default_sets() -> u32 {
    3
}

#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "Instance")]
    id: String,
    #[tabled(rename = "Exercise")]
    name: String,
    #[tabled(rename = "Sets")]
    sets: u32,
    #[tabled(rename = "Weight")]
    weight: String,
    #[tabled(rename = "Reps")]
    programmed_reps: String,
    #[tabled(rename = "Target")]
    tracked_reps: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl InstanceRow {
    fn from_instance(instance: &ExerciseInstance) -> Self {
        Self {
            id: instance.id.clone(),
            name: instance.name.clone(),
            sets: instance.sets,
            weight: instance
                .weight
                .map(|w| w.to_string())
                .unwrap_or_else(|| "-".to_string()),
            programmed_reps: instance.programmed_reps.clone(),
            tracked_reps: instance
                .tracked_reps
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            status: if instance.completed {
                "done".to_string()
            } else {
                "pending".to_string()
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&log_config)?;

    fs::create_dir_all(&config.settings.data_dir).with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.settings.data_dir.display()
        )
    })?;
    let db = Database::new(config.settings.database_path())
        .context("Failed to open workout database")?;

    match cli.command {
        Commands::Import { file } => import_program(&db, &file),
        Commands::LogSet {
            instance,
            set,
            reps,
            weight,
        } => log_set(&db, &instance, set, reps, weight),
        Commands::Complete {
            instance,
            difficulty,
            fatigue,
            pain,
        } => complete(&db, &config, &instance, &difficulty, fatigue, pain),
        Commands::SetIncrement { instance, value } => set_increment(&db, &instance, value),
        Commands::Next { instance } => show_next(&db, &instance),
        Commands::Show { enrollment } => show_enrollment(&db, &enrollment),
    }
}

fn import_program(db: &Database, file: &PathBuf) -> Result<()> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read program file {}", file.display()))?;
    let program: ProgramFile =
        serde_json::from_str(&contents).context("Failed to parse program file")?;

    // Validate rep specs loudly at the authoring boundary
    for workout in &program.workouts {
        for exercise in &workout.exercises {
            RepsRange::parse(&exercise.programmed_reps).with_context(|| {
                format!(
                    "Exercise \"{}\" has a malformed reps spec \"{}\"",
                    exercise.name, exercise.programmed_reps
                )
            })?;
        }
    }

    let enrollment_id = program
        .enrollment_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    db.insert_enrollment(&enrollment_id, &program.program_name)?;

    let mut instance_count = 0;
    for workout in program.workouts {
        let workout_id = workout.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let created_at = Utc::now();
        db.insert_workout(&workout_id, &enrollment_id, &workout.name, created_at)?;

        for exercise in workout.exercises {
            let instance = ExerciseInstance {
                id: exercise.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                name: exercise.name,
                muscle_group: exercise.muscle_group,
                original_exercise_id: exercise.original_exercise_id,
                custom_substitute_id: exercise.custom_substitute_id,
                sets: exercise.sets.max(1),
                weight: exercise.weight,
                programmed_reps: exercise.programmed_reps,
                tracked_reps: None,
                min_increment: exercise.min_increment,
                increment_configured: exercise.min_increment.is_some(),
                completed: false,
                substituted: false,
                difficulty: None,
                fatigue: None,
                pain: None,
                workout_id: workout_id.clone(),
                enrollment_id: enrollment_id.clone(),
                workout_created_at: created_at,
            };
            db.insert_instance(&instance)?;
            instance_count += 1;
        }
    }

    println!(
        "{} {} ({} instances)",
        "✓ Imported program".green().bold(),
        enrollment_id,
        instance_count
    );
    Ok(())
}

fn log_set(
    db: &Database,
    instance_id: &str,
    set_number: u32,
    reps: u32,
    weight: Option<Decimal>,
) -> Result<()> {
    // Fails when the instance is unknown
    let instance = db.get_instance(instance_id)?;

    let set = ExerciseSet {
        id: Uuid::new_v4().to_string(),
        instance_id: instance.id.clone(),
        set_number,
        weight: weight.or(instance.weight),
        reps,
        completed: true,
    };
    db.insert_set(&set)?;

    println!(
        "{} set {} of {}: {} reps",
        "✓ Logged".green(),
        set_number,
        instance.name,
        reps
    );
    Ok(())
}

fn complete(
    db: &Database,
    config: &AppConfig,
    instance_id: &str,
    difficulty: &str,
    fatigue: u8,
    pain: Option<u8>,
) -> Result<()> {
    let difficulty: Difficulty = difficulty
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Invalid difficulty rating")?;

    let orchestrator =
        ProgressionOrchestrator::with_defaults(db, config.progression.engine_defaults());
    // An Err here means the completion itself was not recorded
    let outcome = orchestrator
        .on_exercise_completed(instance_id, difficulty, fatigue, pain)
        .context("Failed to record exercise completion")?;

    match outcome {
        ProgressionOutcome::Precomputed {
            next_instance_id,
            result,
        } => {
            println!("{}", "✓ Exercise completed".green().bold());
            let deload = if result.deload {
                " (deload)".yellow().to_string()
            } else {
                String::new()
            };
            println!(
                "  Next session ({}): {} x {} reps @ {}{}",
                next_instance_id,
                result.sets,
                result.tracked_reps,
                result.weight,
                deload
            );
        }
        ProgressionOutcome::SeriesAdjusted {
            next_instance_id,
            sets,
        } => {
            println!("{}", "✓ Exercise completed (substituted)".green().bold());
            println!("  Next session ({}): {} sets", next_instance_id, sets);
        }
        ProgressionOutcome::NoChainIdentity => {
            println!("{}", "✓ Exercise completed".green().bold());
            println!("  {}", "No linked exercise, nothing to precompute".dimmed());
        }
        ProgressionOutcome::NoNextInstance => {
            println!("{}", "✓ Exercise completed".green().bold());
            println!("  {}", "No future occurrence in this program".dimmed());
        }
        ProgressionOutcome::PrecomputeFailed { reason } => {
            println!("{}", "✓ Exercise completed".green().bold());
            println!("  {} {}", "⚠".yellow(), reason.yellow());
        }
    }
    Ok(())
}

fn set_increment(db: &Database, instance_id: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        anyhow::bail!("Increment must be positive");
    }
    let instance = db.get_instance(instance_id)?;
    let identity = ChainIdentity::of(&instance);

    // The configured instance itself is updated even when it has no chain
    db.update_instance(
        &instance.id,
        &liftrs::models::InstanceUpdate {
            min_increment: Some(value),
            increment_configured: Some(true),
            ..Default::default()
        },
    )?;

    let count = IncrementPropagator::propagate_increment(db, &identity, &instance.enrollment_id, value)?;
    println!(
        "{} {} across {} pending instance(s)",
        "✓ Increment set to".green(),
        value,
        count
    );
    Ok(())
}

fn show_next(db: &Database, instance_id: &str) -> Result<()> {
    let instance = db.get_instance(instance_id)?;
    let identity = ChainIdentity::of(&instance);
    let next = NextInstanceLocator::find_next(db, &identity, &instance.enrollment_id, &instance.id)?;

    match next {
        Some(next) => {
            let table = Table::new(vec![InstanceRow::from_instance(&next)]);
            println!("{}", table);
        }
        None => println!("{}", "No pending occurrence of this exercise".dimmed()),
    }
    Ok(())
}

fn show_enrollment(db: &Database, enrollment_id: &str) -> Result<()> {
    let instances = db.list_instances(enrollment_id)?;
    if instances.is_empty() {
        println!("{}", "No instances found for this enrollment".dimmed());
        return Ok(());
    }
    let rows: Vec<InstanceRow> = instances.iter().map(InstanceRow::from_instance).collect();
    println!("{}", Table::new(rows));
    Ok(())
}
