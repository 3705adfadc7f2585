use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::restore::Step;

#[derive(Parser, Debug)]
#[command(name = "rinkadmin")]
#[command(version, about = "Restore, migrate, and import skating-tracker data")]
pub struct Cli {
    /// Data root holding fixtures/, migrations/, and sessions/
    /// (defaults to the directory containing the executable)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Database path (defaults to <data root>/rinkadmin.sqlite3)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore user data from YAML fixtures into the database
    Restore {
        /// User fixture directory name (e.g. sparkles)
        username: String,

        /// Run all restore steps in dependency order
        #[arg(long)]
        all: bool,

        /// Run specific step(s); always applied in dependency order
        #[arg(long = "step", value_enum)]
        steps: Vec<Step>,
    },

    /// Migrate a legacy CSV export (integer ids) with id translation
    Migrate {
        /// User migration directory name
        username: String,

        /// Path to the legacy CSV export (relative to the caller's cwd)
        #[arg(long)]
        csv: PathBuf,
    },

    /// Import post-migration session rows from CSV
    ImportSessions {
        username: String,

        /// Path to a CSV file with target-scheme ids
        csv_path: PathBuf,
    },

    /// Import maintenance records from CSV
    ImportMaintenance {
        username: String,
        csv_path: PathBuf,
    },

    /// Validate user fixtures without touching the database
    Validate {
        /// User fixture directory name
        username: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
