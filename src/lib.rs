// Library interface for the liftrs progression engine
// Allows integration tests and embedding UIs to access the core functionality

pub mod baseline;
pub mod config;
pub mod database;
pub mod error;
pub mod locator;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod reps;
pub mod store;

// Re-export commonly used types for convenience
pub use baseline::BaselineResolver;
pub use error::{ProgressionError, Result, StoreError};
pub use locator::NextInstanceLocator;
pub use models::{
    Baseline, BaselineSource, ChainIdentity, Difficulty, ExerciseInstance, ExerciseSet,
    InstanceUpdate, ProgressionMode, ProgressionResult, ProgressionSnapshot,
};
pub use orchestrator::{IncrementPropagator, ProgressionOrchestrator, ProgressionOutcome};
pub use policy::{PolicyDefaults, ProgressionPolicy, DEFAULT_INCREMENT};
pub use reps::{is_double_progression, progression_mode, RepsRange};
pub use store::{InstanceStore, MemoryStore};
pub use logging::{LogConfig, LogFormat, LogLevel};
