use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing credential: set {env_var} to use the {endpoint} endpoint")]
    MissingCredential { env_var: String, endpoint: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No reporters available from {url}")]
    NoReporters { url: String },

    #[error("Download error: {message}")]
    DownloadError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HarvestError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarvestError::ApiError(_) | HarvestError::HttpStatus { .. } => ErrorCategory::Network,
            HarvestError::MissingCredential { .. }
            | HarvestError::ConfigError { .. }
            | HarvestError::MissingConfigError { .. }
            | HarvestError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            HarvestError::CsvError(_)
            | HarvestError::SerializationError(_)
            | HarvestError::NoReporters { .. } => ErrorCategory::Data,
            HarvestError::IoError(_) | HarvestError::DownloadError { .. } => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HarvestError::ApiError(e) if e.is_timeout() => {
                "The Comtrade API did not answer in time".to_string()
            }
            HarvestError::ApiError(_) => "Could not reach the Comtrade API".to_string(),
            HarvestError::HttpStatus { status, .. } => {
                format!("The Comtrade API rejected the request (HTTP {})", status)
            }
            HarvestError::MissingCredential { env_var, .. } => {
                format!("The authenticated endpoint needs {}", env_var)
            }
            HarvestError::NoReporters { .. } => "No reporter countries were found".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HarvestError::ApiError(_) => "Check network connectivity and try again",
            HarvestError::HttpStatus { .. } => {
                "Check the query codes, or wait and retry later if the service is throttling"
            }
            HarvestError::MissingCredential { .. } => {
                "Export COMTRADE_API_KEY or switch back to the preview endpoint"
            }
            HarvestError::ConfigError { .. }
            | HarvestError::MissingConfigError { .. }
            | HarvestError::InvalidConfigValueError { .. } => {
                "Review the command line flags and the TOML configuration file"
            }
            HarvestError::NoReporters { .. } => "Check the reporter list URL",
            HarvestError::CsvError(_) | HarvestError::SerializationError(_) => {
                "The upstream format may have changed; inspect the raw response"
            }
            HarvestError::IoError(_) => "Check that the output directory is writable",
            HarvestError::DownloadError { .. } => {
                "Check the driver command and the download directory"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
