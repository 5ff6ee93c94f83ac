//! SQLite-backed instance store
//!
//! Persists program enrollments, workouts, exercise instances and logged
//! sets, and implements the [`InstanceStore`] capabilities the engine needs.
//! Weights are stored as decimal strings to keep exact plate arithmetic.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;

use crate::error::StoreError;
use crate::models::{ChainIdentity, Difficulty, ExerciseInstance, ExerciseSet, InstanceUpdate};
use crate::store::InstanceStore;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound {
                entity: "record".to_string(),
                id: String::new(),
            },
            other => StoreError::QueryFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Database connection and management
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path).map_err(|e| StoreError::Connection {
            reason: e.to_string(),
        })?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Connection {
            reason: e.to_string(),
        })?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), StoreError> {
        // WAL for better concurrent access from a UI process
        self.conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS enrollments (
                id TEXT PRIMARY KEY,
                program_name TEXT NOT NULL,
                started_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS workouts (
                id TEXT PRIMARY KEY,
                enrollment_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at DATETIME NOT NULL,

                FOREIGN KEY (enrollment_id) REFERENCES enrollments (id)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS exercise_instances (
                id TEXT PRIMARY KEY,
                workout_id TEXT NOT NULL,
                enrollment_id TEXT NOT NULL,
                name TEXT NOT NULL,
                muscle_group TEXT,
                original_exercise_id TEXT,
                custom_substitute_id TEXT,
                sets INTEGER NOT NULL DEFAULT 3,
                weight TEXT,
                programmed_reps TEXT NOT NULL,
                tracked_reps INTEGER,
                min_increment TEXT,
                increment_configured BOOLEAN NOT NULL DEFAULT FALSE,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                substituted BOOLEAN NOT NULL DEFAULT FALSE,
                difficulty TEXT,
                fatigue INTEGER,
                pain INTEGER,

                FOREIGN KEY (workout_id) REFERENCES workouts (id),
                FOREIGN KEY (enrollment_id) REFERENCES enrollments (id)
            )
            "#,
            [],
        )?;

        self.conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS exercise_sets (
                id TEXT PRIMARY KEY,
                instance_id TEXT NOT NULL,
                set_number INTEGER NOT NULL,
                weight TEXT,
                reps INTEGER NOT NULL,
                completed BOOLEAN NOT NULL DEFAULT FALSE,

                FOREIGN KEY (instance_id) REFERENCES exercise_instances (id) ON DELETE CASCADE
            )
            "#,
            [],
        )?;

        // Indexes for the chain queries
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_instances_original
             ON exercise_instances (enrollment_id, original_exercise_id, completed)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_instances_substitute
             ON exercise_instances (enrollment_id, custom_substitute_id, completed)",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sets_instance
             ON exercise_sets (instance_id, set_number)",
            [],
        )?;

        Ok(())
    }

    /// Insert a program enrollment
    pub fn insert_enrollment(&self, id: &str, program_name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO enrollments (id, program_name) VALUES (?1, ?2)",
            params![id, program_name],
        )?;
        Ok(())
    }

    /// Insert a workout within an enrollment
    pub fn insert_workout(
        &self,
        id: &str,
        enrollment_id: &str,
        name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO workouts (id, enrollment_id, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![id, enrollment_id, name, created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert an exercise instance
    pub fn insert_instance(&self, instance: &ExerciseInstance) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO exercise_instances (
                id, workout_id, enrollment_id, name, muscle_group,
                original_exercise_id, custom_substitute_id, sets, weight,
                programmed_reps, tracked_reps, min_increment,
                increment_configured, completed, substituted,
                difficulty, fatigue, pain
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
            params![
                instance.id,
                instance.workout_id,
                instance.enrollment_id,
                instance.name,
                instance.muscle_group,
                instance.original_exercise_id,
                instance.custom_substitute_id,
                instance.sets,
                instance.weight.map(|w| w.to_string()),
                instance.programmed_reps,
                instance.tracked_reps,
                instance.min_increment.map(|i| i.to_string()),
                instance.increment_configured,
                instance.completed,
                instance.substituted,
                instance.difficulty.map(|d| d.to_string()),
                instance.fatigue,
                instance.pain,
            ],
        )?;
        Ok(())
    }

    /// Insert a logged set
    pub fn insert_set(&self, set: &ExerciseSet) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO exercise_sets (id, instance_id, set_number, weight, reps, completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                set.id,
                set.instance_id,
                set.set_number,
                set.weight.map(|w| w.to_string()),
                set.reps,
                set.completed,
            ],
        )?;
        Ok(())
    }

    /// All instances of an enrollment in workout order (CLI display)
    pub fn list_instances(&self, enrollment_id: &str) -> Result<Vec<ExerciseInstance>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.workout_id, i.enrollment_id, i.name, i.muscle_group,
                    i.original_exercise_id, i.custom_substitute_id, i.sets, i.weight,
                    i.programmed_reps, i.tracked_reps, i.min_increment,
                    i.increment_configured, i.completed, i.substituted,
                    i.difficulty, i.fatigue, i.pain, w.created_at
             FROM exercise_instances i
             JOIN workouts w ON w.id = i.workout_id
             WHERE i.enrollment_id = ?1
             ORDER BY w.created_at ASC, i.id ASC",
        )?;
        let rows = stmt.query_map(params![enrollment_id], Self::instance_from_row)?;
        let mut instances = Vec::new();
        for row in rows {
            instances.push(row?);
        }
        Ok(instances)
    }

    const INSTANCE_SELECT: &'static str =
        "SELECT i.id, i.workout_id, i.enrollment_id, i.name, i.muscle_group,
                i.original_exercise_id, i.custom_substitute_id, i.sets, i.weight,
                i.programmed_reps, i.tracked_reps, i.min_increment,
                i.increment_configured, i.completed, i.substituted,
                i.difficulty, i.fatigue, i.pain, w.created_at
         FROM exercise_instances i
         JOIN workouts w ON w.id = i.workout_id";

    /// Decimal stored as TEXT. Corrupt values surface as conversion errors
    /// rather than silently becoming `None`.
    fn decimal_column(index: usize, raw: Option<String>) -> rusqlite::Result<Option<Decimal>> {
        raw.map(|value| {
            value.parse::<Decimal>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    index,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()
    }

    /// Helper to convert a database row to an ExerciseInstance
    fn instance_from_row(row: &Row) -> rusqlite::Result<ExerciseInstance> {
        let weight: Option<String> = row.get(8)?;
        let min_increment: Option<String> = row.get(11)?;
        let difficulty: Option<String> = row.get(15)?;
        let created_at: String = row.get(18)?;

        let difficulty = difficulty
            .map(|d| {
                d.parse::<Difficulty>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        15,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })
            })
            .transpose()?;
        // A corrupt timestamp would scramble next-instance ordering
        let workout_created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    18,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(ExerciseInstance {
            id: row.get(0)?,
            workout_id: row.get(1)?,
            enrollment_id: row.get(2)?,
            name: row.get(3)?,
            muscle_group: row.get(4)?,
            original_exercise_id: row.get(5)?,
            custom_substitute_id: row.get(6)?,
            sets: row.get(7)?,
            weight: Self::decimal_column(8, weight)?,
            programmed_reps: row.get(9)?,
            tracked_reps: row.get(10)?,
            min_increment: Self::decimal_column(11, min_increment)?,
            increment_configured: row.get(12)?,
            completed: row.get(13)?,
            substituted: row.get(14)?,
            difficulty,
            fatigue: row.get(16)?,
            pain: row.get(17)?,
            workout_created_at,
        })
    }

    /// Column name + bound value for a chain identity match.
    fn chain_column(identity: &ChainIdentity) -> Option<(&'static str, &str)> {
        match identity {
            ChainIdentity::Original(id) => Some(("i.original_exercise_id", id.as_str())),
            ChainIdentity::Custom(id) => Some(("i.custom_substitute_id", id.as_str())),
            ChainIdentity::None => None,
        }
    }
}

impl InstanceStore for Database {
    fn get_instance(&self, id: &str) -> Result<ExerciseInstance, StoreError> {
        let query = format!("{} WHERE i.id = ?1", Self::INSTANCE_SELECT);
        self.conn
            .query_row(&query, params![id], Self::instance_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                entity: "exercise_instance".to_string(),
                id: id.to_string(),
            })
    }

    fn update_instance(&self, id: &str, update: &InstanceUpdate) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        // Build the partial UPDATE from the supplied fields only
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(weight) = update.weight {
            assignments.push("weight = ?");
            values.push(Box::new(weight.to_string()));
        }
        if let Some(sets) = update.sets {
            assignments.push("sets = ?");
            values.push(Box::new(sets));
        }
        if let Some(tracked) = update.tracked_reps {
            assignments.push("tracked_reps = ?");
            values.push(Box::new(tracked));
        }
        if let Some(increment) = update.min_increment {
            assignments.push("min_increment = ?");
            values.push(Box::new(increment.to_string()));
        }
        if let Some(configured) = update.increment_configured {
            assignments.push("increment_configured = ?");
            values.push(Box::new(configured));
        }
        if let Some(completed) = update.completed {
            assignments.push("completed = ?");
            values.push(Box::new(completed));
        }
        if let Some(difficulty) = update.difficulty {
            assignments.push("difficulty = ?");
            values.push(Box::new(difficulty.to_string()));
        }
        if let Some(fatigue) = update.fatigue {
            assignments.push("fatigue = ?");
            values.push(Box::new(fatigue));
        }
        if let Some(pain) = update.pain {
            assignments.push("pain = ?");
            values.push(Box::new(pain));
        }

        let query = format!(
            "UPDATE exercise_instances SET {} WHERE id = ?",
            assignments.join(", ")
        );
        values.push(Box::new(id.to_string()));

        let changed = self
            .conn
            .execute(&query, rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())))
            .map_err(|e| StoreError::WriteFailed {
                entity: "exercise_instance".to_string(),
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "exercise_instance".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn list_sets(&self, instance_id: &str) -> Result<Vec<ExerciseSet>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, instance_id, set_number, weight, reps, completed
             FROM exercise_sets
             WHERE instance_id = ?1
             ORDER BY set_number ASC",
        )?;
        let rows = stmt.query_map(params![instance_id], |row| {
            let weight: Option<String> = row.get(3)?;
            Ok(ExerciseSet {
                id: row.get(0)?,
                instance_id: row.get(1)?,
                set_number: row.get(2)?,
                weight: Self::decimal_column(3, weight)?,
                reps: row.get(4)?,
                completed: row.get(5)?,
            })
        })?;
        let mut sets = Vec::new();
        for row in rows {
            sets.push(row?);
        }
        Ok(sets)
    }

    fn pending_instances(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
    ) -> Result<Vec<ExerciseInstance>, StoreError> {
        let Some((column, value)) = Self::chain_column(identity) else {
            return Ok(Vec::new());
        };
        let query = format!(
            "{} WHERE i.enrollment_id = ?1 AND {} = ?2 AND i.completed = FALSE
             ORDER BY w.created_at ASC, i.id ASC",
            Self::INSTANCE_SELECT,
            column
        );
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map(params![enrollment_id, value], Self::instance_from_row)?;
        let mut instances = Vec::new();
        for row in rows {
            instances.push(row?);
        }
        Ok(instances)
    }

    fn has_completed_instance(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<bool, StoreError> {
        let Some((column, value)) = Self::chain_column(identity) else {
            return Ok(false);
        };
        let query = format!(
            "SELECT COUNT(*) FROM exercise_instances i
             WHERE i.enrollment_id = ?1 AND {} = ?2 AND i.completed = TRUE AND i.id != ?3",
            column
        );
        let count: i64 = self
            .conn
            .query_row(&query, params![enrollment_id, value, exclude_id], |row| {
                row.get(0)
            })?;
        Ok(count > 0)
    }

    fn last_completed_sets(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Vec<ExerciseSet>, StoreError> {
        let Some((column, value)) = Self::chain_column(identity) else {
            return Ok(Vec::new());
        };
        // Most recent completed session of the chain that has logged sets
        let query = format!(
            "SELECT i.id FROM exercise_instances i
             JOIN workouts w ON w.id = i.workout_id
             WHERE i.enrollment_id = ?1 AND {} = ?2 AND i.completed = TRUE AND i.id != ?3
               AND EXISTS (SELECT 1 FROM exercise_sets s WHERE s.instance_id = i.id)
             ORDER BY w.created_at DESC, i.id DESC
             LIMIT 1",
            column
        );
        let prior: Option<String> = self
            .conn
            .query_row(&query, params![enrollment_id, value, exclude_id], |row| {
                row.get(0)
            })
            .optional()?;

        match prior {
            Some(instance_id) => self.list_sets(&instance_id),
            None => Ok(Vec::new()),
        }
    }

    fn chain_increment(
        &self,
        identity: &ChainIdentity,
        enrollment_id: &str,
        exclude_id: &str,
    ) -> Result<Option<Decimal>, StoreError> {
        let Some((column, value)) = Self::chain_column(identity) else {
            return Ok(None);
        };
        let query = format!(
            "SELECT i.min_increment FROM exercise_instances i
             JOIN workouts w ON w.id = i.workout_id
             WHERE i.enrollment_id = ?1 AND {} = ?2 AND i.id != ?3
               AND i.min_increment IS NOT NULL
             ORDER BY w.created_at ASC, i.id ASC
             LIMIT 1",
            column
        );
        let raw: Option<String> = self
            .conn
            .query_row(&query, params![enrollment_id, value, exclude_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(raw.and_then(|r| r.parse::<Decimal>().ok()))
    }
}
