//! Error types for soapbox operations.

use thiserror::Error;

/// Result type alias for soapbox operations.
pub type Result<T> = std::result::Result<T, SoapboxError>;

/// Main error type for soapbox operations.
///
/// The first five variants form the caller-facing taxonomy that maps
/// one-to-one onto wire error codes; the remaining variants cover
/// infrastructure failures and surface to callers with a generic message.
#[derive(Error, Debug)]
pub enum SoapboxError {
    /// Input was missing, empty, or outside the allowed limits
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to perform this mutation
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The operation collides with existing state (e.g. duplicate title)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No usable credential was presented
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoapboxError {
    /// Creates a validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        SoapboxError::Validation(msg.to_string())
    }

    /// Creates a not-found error.
    pub fn not_found<T: ToString>(msg: T) -> Self {
        SoapboxError::NotFound(msg.to_string())
    }

    /// Creates an authorization error.
    pub fn authorization<T: ToString>(msg: T) -> Self {
        SoapboxError::Authorization(msg.to_string())
    }

    /// Creates a conflict error.
    pub fn conflict<T: ToString>(msg: T) -> Self {
        SoapboxError::Conflict(msg.to_string())
    }

    /// Creates an unauthenticated error.
    pub fn unauthenticated<T: ToString>(msg: T) -> Self {
        SoapboxError::Unauthenticated(msg.to_string())
    }

    /// Creates a storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        SoapboxError::Storage(msg.to_string())
    }

    /// Creates a serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        SoapboxError::Serialization(msg.to_string())
    }

    /// Returns the message suitable for showing to an end user.
    ///
    /// Taxonomy errors carry their own human-readable message;
    /// infrastructure errors collapse to a generic one so internals
    /// never leak onto the wire.
    pub fn user_message(&self) -> String {
        match self {
            SoapboxError::Validation(msg)
            | SoapboxError::NotFound(msg)
            | SoapboxError::Authorization(msg)
            | SoapboxError::Conflict(msg)
            | SoapboxError::Unauthenticated(msg) => msg.clone(),
            SoapboxError::Storage(_) | SoapboxError::Serialization(_) | SoapboxError::Io(_) => {
                "something went wrong, please try again later".to_string()
            }
        }
    }

    /// Returns true if retrying the same request can never succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SoapboxError::Validation(_)
                | SoapboxError::Authorization(_)
                | SoapboxError::Conflict(_)
        )
    }
}
