//! Error handling for inferserve
//!
//! Provides a unified error type and result type for use across all
//! inferserve components. Every provider and servable operation returns
//! success or one error kind plus a human-readable message; no panics
//! cross the provider/servable boundary.

/// Result type alias for inferserve operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for inferserve
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed header, unknown input/output, byte-size mismatch
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup of an input/output absent from the model schema
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate output write, double configuration, double scheduler bind
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Operation attempted in an invalid order (e.g. finalize with a
    /// required output missing)
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Execution requested before configuration and scheduler binding
    /// completed
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Allocation failure, scheduler dispatch failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Unsupported combination of protocol and encoding
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// I/O errors (label-file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors (HTTP textual request header)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an already exists error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a failed precondition error
    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    /// Create a not ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unimplemented error
    pub fn unimplemented(msg: impl Into<String>) -> Self {
        Self::Unimplemented(msg.into())
    }

    /// Check if this error indicates a client-side problem
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_)
                | Error::NotFound(_)
                | Error::AlreadyExists(_)
                | Error::FailedPrecondition(_)
        )
    }

    /// Check if this error indicates a server-side problem
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::AlreadyExists(_) => "already_exists",
            Error::FailedPrecondition(_) => "failed_precondition",
            Error::NotReady(_) => "not_ready",
            Error::Internal(_) => "internal",
            Error::Unimplemented(_) => "unimplemented",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Other(_) => "other",
        }
    }

    /// Convert to an HTTP status code (useful for REST frontends)
    pub fn to_http_status(&self) -> u16 {
        match self {
            Error::InvalidArgument(_) | Error::Json(_) => 400, // Bad Request
            Error::NotFound(_) => 404,                         // Not Found
            Error::AlreadyExists(_) => 409,                    // Conflict
            Error::FailedPrecondition(_) => 412,               // Precondition Failed
            Error::NotReady(_) => 503,                         // Service Unavailable
            Error::Unimplemented(_) => 501,                    // Not Implemented
            _ => 500,                                          // Internal Server Error
        }
    }
}

/// Extension trait for adding context to Results
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure
    fn with_context_fn<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn with_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let original_error = e.into();
            Error::Other(anyhow::anyhow!("{}: {}", context.into(), original_error))
        })
    }

    fn with_context_fn<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            Error::Other(anyhow::anyhow!("{}: {}", f(), original_error))
        })
    }
}
