//! Unified error handling.
//!
//! Provides the configuration error raised at startup and a single
//! application error type used by the services.

use std::path::PathBuf;

use domain::DomainError;
use figment::error::{Actual, Kind};
use thiserror::Error;

/// A single configuration field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path of the field, e.g. `database.user`
    pub field: String,
    /// Validation code, e.g. `required`
    pub code: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.field, self.code)
    }
}

/// Errors raised while loading the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Values that do not fit the configuration shape. Only key paths and
    /// value kinds are kept, never the values themselves.
    #[error("Malformed configuration: {}", join_fields(.fields))]
    Extract { fields: Vec<FieldError> },

    #[error("Invalid configuration: {}", join_fields(.fields))]
    Invalid { fields: Vec<FieldError> },

    #[error("Cannot build database URL: {reason}")]
    ConnectionUrl { reason: String },
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigError {
    /// Fields that were malformed or failed validation
    pub fn fields(&self) -> &[FieldError] {
        match self {
            ConfigError::Extract { fields } | ConfigError::Invalid { fields } => fields,
            _ => &[],
        }
    }

    /// Check whether the named field is among the failures
    pub fn names_field(&self, field: &str) -> bool {
        self.fields().iter().any(|f| f.field == field)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        let fields = err
            .into_iter()
            .map(|e| {
                let field = if e.path.is_empty() {
                    "<root>".to_string()
                } else {
                    e.path.join(".")
                };
                FieldError::new(field, describe_kind(&e.kind))
            })
            .collect();

        ConfigError::Extract { fields }
    }
}

fn describe_kind(kind: &Kind) -> String {
    match kind {
        Kind::InvalidType(actual, expected) => {
            format!("invalid type: found {}, expected {}", describe_actual(actual), expected)
        }
        Kind::InvalidValue(actual, expected) => {
            format!("invalid value: found {}, expected {}", describe_actual(actual), expected)
        }
        Kind::MissingField(field) => format!("missing field `{}`", field),
        Kind::UnknownField(field, _) => format!("unknown field `{}`", field),
        Kind::DuplicateField(field) => format!("duplicate field `{}`", field),
        _ => "unsupported value".to_string(),
    }
}

// Payload-carrying variants are reduced to their kind.
fn describe_actual(actual: &Actual) -> &'static str {
    match actual {
        Actual::Bool(_) => "boolean",
        Actual::Unsigned(_) | Actual::Signed(_) => "integer",
        Actual::Float(_) => "float",
        Actual::Char(_) => "char",
        Actual::Str(_) => "string",
        Actual::Bytes(_) => "bytes",
        Actual::Unit => "unit",
        Actual::Option => "option",
        Actual::Seq => "sequence",
        Actual::Map => "map",
        _ => "value",
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Validation
    #[error("{0}")]
    Validation(String),

    // Startup
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal error")]
    Internal(String),
}

impl AppError {
    /// Get error code for logs and callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),

            // Hide details for internal errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::NotFound(_) => AppError::NotFound,
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
