//! Core domain logic for TaskWeave.
//! This crate owns the task model, scoring, lifecycle rules and persistence;
//! front ends only render the board and forward user intent.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod priority;
pub mod service;
pub mod session;
pub mod store;

pub use config::{
    default_config_path, AppConfig, ConfigError, ConfigOverrides, LoggingConfig, SessionConfig,
    StorageBackend, StorageConfig,
};
pub use logging::{init_logging, logging_status, LoggingError};
pub use model::task::{
    now_epoch_ms, OwnerId, Task, TaskDraft, TaskId, TaskPatch, TaskValidationError, WeightField,
    WEIGHT_MAX, WEIGHT_MIN,
};
pub use priority::{score, score_label, select_next};
pub use service::board::{PendingEdit, TaskBoard};
pub use service::task_service::{CompleteOutcome, TaskService, TaskServiceError};
pub use session::{SessionEvent, SessionHub, SessionProvider, StaticSession};
pub use store::{
    AnyTaskStore, LocalSnapshot, LocalTaskStore, PersistenceError, SqliteTaskStore, StoreResult,
    TaskStore,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
