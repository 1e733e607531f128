use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Store request to '{table}' failed with status {status}: {message}")]
    StoreError {
        table: String,
        status: u16,
        message: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Failed to load roster for period {period_id}: {message}")]
    LoadFailure { period_id: i64, message: String },

    #[error("Migration write rejected: {message}")]
    WriteFailure { message: String },

    #[error("Class offering {offering_id} is not part of the {roster} roster")]
    UnknownOffering { offering_id: i64, roster: String },

    #[error("Professor {professor_id} does not teach any offering in the target period")]
    UnknownProfessor { professor_id: i64 },

    #[error("Class offering {offering_id} has no target pairing")]
    NotPaired { offering_id: i64 },

    #[error("Invalid planner state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Authentication,
    Data,
    Planning,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MigrateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrateError::ApiError(_) | MigrateError::StoreError { .. } => ErrorCategory::Network,
            MigrateError::ConfigError { .. }
            | MigrateError::ConfigValidationError { .. }
            | MigrateError::InvalidConfigValueError { .. }
            | MigrateError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MigrateError::AuthError { .. } => ErrorCategory::Authentication,
            MigrateError::LoadFailure { .. }
            | MigrateError::WriteFailure { .. }
            | MigrateError::CsvError(_)
            | MigrateError::SerializationError(_) => ErrorCategory::Data,
            MigrateError::UnknownOffering { .. }
            | MigrateError::UnknownProfessor { .. }
            | MigrateError::NotPaired { .. }
            | MigrateError::InvalidState { .. } => ErrorCategory::Planning,
            MigrateError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Planning => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration
            | ErrorCategory::Authentication
            | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MigrateError::ApiError(_) => "Check network connectivity and the store URL",
            MigrateError::StoreError { .. } => {
                "Check the API key and that the table exists and is readable"
            }
            MigrateError::AuthError { .. } => {
                "Verify the email and password in the [auth] section"
            }
            MigrateError::ConfigError { .. }
            | MigrateError::ConfigValidationError { .. }
            | MigrateError::InvalidConfigValueError { .. }
            | MigrateError::MissingConfigError { .. } => {
                "Fix the configuration file and run again"
            }
            MigrateError::LoadFailure { .. } => "Check that both periods exist and retry the load",
            MigrateError::WriteFailure { .. } => {
                "Inspect the target classes before retrying; some rows may already be inserted"
            }
            MigrateError::UnknownOffering { .. } | MigrateError::NotPaired { .. } => {
                "Run `preview` to list the offerings of both periods"
            }
            MigrateError::UnknownProfessor { .. } => {
                "Pick a professor who teaches in the target period"
            }
            MigrateError::InvalidState { .. } => "Load both rosters before editing the plan",
            MigrateError::CsvError(_) | MigrateError::SerializationError(_) => {
                "The store returned data in an unexpected shape"
            }
            MigrateError::IoError(_) => "Check file permissions and free disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            MigrateError::WriteFailure { message } => format!("Error: {}", message),
            MigrateError::LoadFailure { period_id, .. } => {
                format!("Could not load the classes of period {}", period_id)
            }
            MigrateError::AuthError { message } => format!("Sign-in failed: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
