//! Error kinds for lokql operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help callers write clear error handling
/// logic. Callers can match on ErrorKind to decide how to handle specific
/// error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid argument passed to an operation
    InvalidArgument,

    // =========================================================================
    // Configuration errors
    // =========================================================================
    /// A required configuration value is absent
    ConfigMissing,

    /// A configuration value is present but invalid
    ConfigInvalid,

    // =========================================================================
    // Log backend errors
    // =========================================================================
    /// The log backend could not be reached or timed out
    BackendUnavailable,

    /// The log backend rejected the query (client error)
    QueryRejected,

    /// Failed to decode a response body
    ParseFailed,

    // =========================================================================
    // LLM provider errors
    // =========================================================================
    /// The LLM provider could not be reached
    ProviderUnavailable,

    /// The LLM provider rejected the credentials
    AuthenticationFailed,

    /// The LLM provider rate limited the request
    RateLimited,

    /// The completion came back unusable (empty, malformed tool call)
    CompletionFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// IO operation failed
    IoFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::InvalidArgument => "InvalidArgument",

            ErrorKind::ConfigMissing => "ConfigMissing",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::BackendUnavailable => "BackendUnavailable",
            ErrorKind::QueryRejected => "QueryRejected",
            ErrorKind::ParseFailed => "ParseFailed",

            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::CompletionFailed => "CompletionFailed",

            ErrorKind::IoFailed => "IoFailed",
        }
    }

    /// Check if this error kind is retryable by default.
    ///
    /// Nothing in lokql retries automatically; this only informs the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::BackendUnavailable
                | ErrorKind::ProviderUnavailable
                | ErrorKind::RateLimited
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
