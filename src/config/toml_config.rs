use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MigrateError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PROFESSOR_ROLE: &str = "professor";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub auth: Option<AuthConfig>,
    pub migration: Option<MigrationConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub professor_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(MigrateError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MigrateError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Builds a configuration from `SUPABASE_URL` / `SUPABASE_ANON_KEY` and the
    /// optional `SCHOOL_EMAIL` / `SCHOOL_PASSWORD` pair.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL").map_err(|_| MigrateError::MissingConfigError {
            field: "SUPABASE_URL".to_string(),
        })?;
        let api_key =
            std::env::var("SUPABASE_ANON_KEY").map_err(|_| MigrateError::MissingConfigError {
                field: "SUPABASE_ANON_KEY".to_string(),
            })?;
        let auth = match (
            std::env::var("SCHOOL_EMAIL").ok(),
            std::env::var("SCHOOL_PASSWORD").ok(),
        ) {
            (None, None) => None,
            (email, password) => Some(AuthConfig { email, password }),
        };

        Ok(Self {
            store: StoreConfig {
                url,
                api_key,
                timeout_seconds: None,
            },
            auth,
            migration: None,
            logging: None,
        })
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MigrateError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("store.url", &self.store.url)?;
        validate_non_empty_string("store.api_key", &self.store.api_key)?;
        if self.store.api_key.starts_with("${") {
            return Err(MigrateError::ConfigValidationError {
                field: "store.api_key".to_string(),
                message: format!("environment variable {} is not set", self.store.api_key),
            });
        }

        if let Some(timeout) = self.store.timeout_seconds {
            validate_range("store.timeout_seconds", timeout, 1, 600)?;
        }

        if let Some(auth) = &self.auth {
            let email = validate_required_field("auth.email", &auth.email)?;
            validate_non_empty_string("auth.email", email)?;
            validate_required_field("auth.password", &auth.password)?;
        }

        validate_non_empty_string("migration.professor_role", self.professor_role())?;
        Ok(())
    }

    /// Email and password when an `[auth]` section is present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let auth = self.auth.as_ref()?;
        Some((auth.email.as_deref()?, auth.password.as_deref()?))
    }

    pub fn professor_role(&self) -> &str {
        self.migration
            .as_ref()
            .and_then(|m| m.professor_role.as_deref())
            .unwrap_or(DEFAULT_PROFESSOR_ROLE)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn store_url(&self) -> &str {
        &self.store.url
    }

    fn api_key(&self) -> &str {
        &self.store.api_key
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.store.timeout_seconds
    }

    fn professor_role(&self) -> &str {
        TomlConfig::professor_role(self)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
