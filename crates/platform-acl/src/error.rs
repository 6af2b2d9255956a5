//! Error types for access-control operations
//!
//! Construction errors abort model building, so no partially valid engine is
//! ever produced. Query errors are surfaced to the caller and never folded
//! into a deny.

use thiserror::Error;

/// Access-control error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    /// A query, inheritance edge or rule references a role that was never registered
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// A query or rule references a resource that was never registered
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// A rule names an action the resource does not recognize
    #[error("Unknown action '{action}' on resource '{resource}'")]
    UnknownAction {
        /// Resource the rule targets.
        resource: String,
        /// Action that is not part of the resource's action list.
        action: String,
    },

    /// The resource identifier was already registered
    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    /// Adding an inheritance edge would close a cycle
    #[error("Cyclic role inheritance: {path}")]
    Cycle {
        /// The offending chain, e.g. `b -> a -> b`.
        path: String,
    },

    /// The same triple was recorded as both allowed and denied (strict mode)
    #[error("Conflicting rules for role '{role}' on {resource}:{action}")]
    ConflictingRule {
        /// Role the rules belong to.
        role: String,
        /// Resource identifier or `*`.
        resource: String,
        /// Action identifier or `*`.
        action: String,
    },

    /// Empty identifier, or a reserved one used where it is not allowed
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {key}: {message}")]
    Config {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },

    /// The configuration document could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Result type for access-control operations.
pub type AclResult<T> = Result<T, AclError>;

impl AclError {
    /// Check if this error can only be raised while building a model.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            AclError::UnknownAction { .. }
                | AclError::DuplicateResource(_)
                | AclError::Cycle { .. }
                | AclError::ConflictingRule { .. }
                | AclError::InvalidIdentifier(_)
                | AclError::Config { .. }
                | AclError::Parse(_)
        )
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AclError::UnknownRole(_) => "UNKNOWN_ROLE",
            AclError::UnknownResource(_) => "UNKNOWN_RESOURCE",
            AclError::UnknownAction { .. } => "UNKNOWN_ACTION",
            AclError::DuplicateResource(_) => "DUPLICATE_RESOURCE",
            AclError::Cycle { .. } => "CYCLIC_INHERITANCE",
            AclError::ConflictingRule { .. } => "CONFLICTING_RULE",
            AclError::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            AclError::Config { .. } => "CONFIG_ERROR",
            AclError::Parse(_) => "PARSE_ERROR",
        }
    }
}

impl From<serde_json::Error> for AclError {
    fn from(err: serde_json::Error) -> Self {
        AclError::Parse(err.to_string())
    }
}
