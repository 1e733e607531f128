#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// Loads `path` when given, otherwise the `SUPABASE_*` environment, and validates it.
pub fn load(path: Option<&str>) -> Result<TomlConfig> {
    let config = match path {
        Some(path) => {
            tracing::debug!("Loading configuration from {}", path);
            TomlConfig::from_file(path)?
        }
        None => TomlConfig::from_env()?,
    };
    config.validate()?;
    Ok(config)
}
