//! Migration execution: progress tracking and the engine boundary.

pub mod engine;
pub mod progress;

pub use engine::{DryRunEngine, MigrationEngine, MigrationOutcome, MigrationStatus};
pub use progress::{ProgressSink, ProgressTracker, Step, StepUpdate};
