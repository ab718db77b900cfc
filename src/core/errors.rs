/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::guard::GuardError;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export MemoryError from memory module
pub use crate::memory::MemoryError;

/// Unified resource error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum ResourceError {
    #[error("Allocation error: {0}")]
    #[diagnostic(
        code(resource::allocation),
        help("The memory pool could not satisfy the request. Release resources or raise the pool capacity.")
    )]
    Allocation(#[from] MemoryError),

    #[error("I/O error on {context}: {source}")]
    #[diagnostic(
        code(resource::io),
        help("Filesystem operation failed. Check the path, permissions and disk space.")
    )]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Capacity exceeded: {requested} bytes into a buffer of {capacity} bytes")]
    #[diagnostic(
        code(resource::capacity),
        help("The write was rejected and the buffer left unchanged. Shorten the input.")
    )]
    Capacity { requested: usize, capacity: usize },

    #[error("Registry is closed")]
    #[diagnostic(
        code(resource::registry_closed),
        help("The registry was shut down; its instance will not be recreated.")
    )]
    RegistryClosed,

    #[error("{0} has already been released")]
    #[diagnostic(code(resource::released))]
    Released(&'static str),

    #[error("Counter overflow")]
    #[diagnostic(code(resource::counter_overflow))]
    CounterOverflow,

    #[error("Guard error: {0}")]
    #[diagnostic(code(resource::guard))]
    Guard(#[from] GuardError),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(resource::configuration),
        help("Invalid configuration. Review RESOURCE_* variables or the config file.")
    )]
    Configuration(String),

    #[error("Interop error: {0}")]
    #[diagnostic(code(resource::interop))]
    Interop(String),
}

impl ResourceError {
    /// Wrap an I/O error with the path or operation it came from
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ResourceError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceError::Allocation(_) => "allocation_error",
            ResourceError::Io { .. } => "io_error",
            ResourceError::Capacity { .. } => "capacity_error",
            ResourceError::RegistryClosed => "registry_closed_error",
            ResourceError::Released(_) => "released",
            ResourceError::CounterOverflow => "counter_overflow",
            ResourceError::Guard(_) => "guard_error",
            ResourceError::Configuration(_) => "configuration_error",
            ResourceError::Interop(_) => "interop_error",
        }
    }
}

// Implement conversion from std::io::Error
impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::io("io", err)
    }
}

/// Serializable error representation for reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl SerializableError {
    /// Create a new serializable error
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a new serializable error with details
    pub fn with_details(
        error_type: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }
}

impl From<&ResourceError> for SerializableError {
    fn from(err: &ResourceError) -> Self {
        match err.help() {
            Some(help) => SerializableError::with_details(err.kind(), err.to_string(), help.to_string()),
            None => SerializableError::new(err.kind(), err.to_string()),
        }
    }
}

impl From<ResourceError> for SerializableError {
    fn from(err: ResourceError) -> Self {
        SerializableError::from(&err)
    }
}
