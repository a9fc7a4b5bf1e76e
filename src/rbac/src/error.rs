//! Error types for the access control engine

use thiserror::Error;

use crate::config::ConfigError;

/// Access control engine errors
#[derive(Debug, Error)]
pub enum RbacError {
    /// Malformed configuration option
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Role type outside the configured roles list
    #[error("Unrecognized role type: {0}")]
    UnknownRoleType(String),

    /// Resource type outside the configured resources list
    #[error("Unrecognized resource type: {0}")]
    UnknownResourceType(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audit log backend failure
    #[error("Audit log error: {0}")]
    AuditLog(String),
}

/// Result type for access control operations
pub type Result<T> = std::result::Result<T, RbacError>;
