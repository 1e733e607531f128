pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{auth::AuthClient, rest_store::RestStore};
pub use core::{
    planner::{MigrationOutcome, MigrationPlanner, MigrationReport},
    preview::MigrationPreview,
};
pub use utils::error::{MigrateError, Result};
