use thiserror::Error;

#[derive(Error, Debug)]
pub enum BioremError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid KO identifier '{value}': expected 'K' followed by 5 digits")]
    InvalidKo { value: String },

    #[error("Invalid sample identifier '{value}': {reason}")]
    InvalidSampleId { value: String, reason: String },

    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Upload error at line {line}: {message}")]
    Upload { line: usize, message: String },

    #[error("Upload limit exceeded: {actual} {what} (maximum {limit})")]
    LimitExceeded {
        what: String,
        limit: usize,
        actual: usize,
    },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Export error: {message}")]
    ExportError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Reference,
    Configuration,
    Processing,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BioremError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BioremError::InvalidKo { .. }
            | BioremError::InvalidSampleId { .. }
            | BioremError::Upload { .. }
            | BioremError::LimitExceeded { .. } => ErrorCategory::Input,
            BioremError::MissingColumn { .. } | BioremError::CsvError(_) => {
                ErrorCategory::Reference
            }
            BioremError::InvalidConfigValueError { .. }
            | BioremError::MissingConfigError { .. }
            | BioremError::TomlError(_) => ErrorCategory::Configuration,
            BioremError::ProcessingError { .. } => ErrorCategory::Processing,
            BioremError::ExportError { .. }
            | BioremError::ZipError(_)
            | BioremError::SerializationError(_) => ErrorCategory::Output,
            BioremError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Reference => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Output => ErrorSeverity::Medium,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BioremError::InvalidKo { .. } => {
                "Make sure every KO line looks like K00001 (uppercase K and five digits)".to_string()
            }
            BioremError::InvalidSampleId { .. } => {
                "Sample names follow '>' directly and must not contain spaces".to_string()
            }
            BioremError::Upload { line, .. } => {
                format!("Check the input file around line {}", line)
            }
            BioremError::LimitExceeded { what, limit, .. } => {
                format!("Split the input so that it contains at most {} {}", limit, what)
            }
            BioremError::MissingColumn { table, .. } => {
                format!("Verify the header row of {}", table)
            }
            BioremError::InvalidConfigValueError { .. }
            | BioremError::MissingConfigError { .. }
            | BioremError::TomlError(_) => {
                "Review the command line arguments or the TOML configuration file".to_string()
            }
            BioremError::CsvError(_) => {
                "Check the reference database files and the configured delimiter".to_string()
            }
            BioremError::IoError(_) => {
                "Check that the paths exist and that you have read/write permission".to_string()
            }
            BioremError::ExportError { .. }
            | BioremError::ZipError(_)
            | BioremError::SerializationError(_) => {
                "Try a different output format (csv is not row limited)".to_string()
            }
            BioremError::ProcessingError { .. } => "Retry the processing run".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("The uploaded file is not valid: {}", self),
            ErrorCategory::Reference => format!("A reference database could not be used: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::Output => format!("Results could not be written: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BioremError>;
