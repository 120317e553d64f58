//! Command-line surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskweave_core::{ConfigOverrides, OwnerId, StorageBackend};
use uuid::Uuid;

/// Personal task prioritization: add tasks, then work on the one that scores
/// highest.
#[derive(Debug, Parser)]
#[command(name = "taskweave", version, about)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "TASKWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage backend: local | sqlite.
    #[arg(long, global = true, env = "TASKWEAVE_BACKEND")]
    pub backend: Option<StorageBackend>,

    /// Directory holding the task file or database.
    #[arg(long, global = true, env = "TASKWEAVE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Owner id for the sqlite backend.
    #[arg(long, global = true, env = "TASKWEAVE_USER")]
    pub user: Option<Uuid>,

    /// Log level: trace | debug | info | warn | error.
    #[arg(long, global = true, env = "TASKWEAVE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[arg(long, global = true, env = "TASKWEAVE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            backend: self.backend,
            data_dir: self.data_dir.clone(),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            user_id: self.user.map(OwnerId::new),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a new active task.
    Add {
        /// What needs doing.
        text: String,
        /// 1-10.
        #[arg(long, short = 'u', default_value_t = 5)]
        urgency: u8,
        /// 1-10.
        #[arg(long, short = 'i', default_value_t = 5)]
        importance: u8,
        /// 1-10.
        #[arg(long, short = 'e', default_value_t = 5)]
        enjoyment: u8,
        /// Estimated minutes.
        #[arg(long, short = 'm', default_value_t = 30)]
        minutes: u32,
        /// Recreate the task each time it is completed.
        #[arg(long)]
        recurring: bool,
    },

    /// List active tasks with their scores.
    List,

    /// Show the task to work on now.
    Next,

    /// Change fields of an active task; omitted fields keep their value.
    Edit {
        id: i64,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        urgency: Option<u8>,
        #[arg(long)]
        importance: Option<u8>,
        #[arg(long)]
        enjoyment: Option<u8>,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        recurring: Option<bool>,
    },

    /// Mark an active task as done.
    Complete { id: i64 },

    /// Show completed tasks, most recent first.
    History {
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use taskweave_core::StorageBackend;

    #[test]
    fn add_uses_form_defaults() {
        let cli = Cli::try_parse_from(["taskweave", "add", "Write report"]).unwrap();
        match cli.command {
            Command::Add {
                text,
                urgency,
                importance,
                enjoyment,
                minutes,
                recurring,
            } => {
                assert_eq!(text, "Write report");
                assert_eq!((urgency, importance, enjoyment), (5, 5, 5));
                assert_eq!(minutes, 30);
                assert!(!recurring);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "taskweave",
            "list",
            "--backend",
            "sqlite",
            "--user",
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.backend, Some(StorageBackend::Sqlite));
        assert!(overrides.user_id.is_some());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["taskweave", "--backend", "cloud", "list"]).is_err());
    }
}
