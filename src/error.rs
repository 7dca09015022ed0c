//! Error types for the card render pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can terminate a render request
#[derive(Error, Debug)]
pub enum Error {
    /// A required numeric or enumerated field could not be parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required upload (background or subject image) was not supplied
    #[error("{0}")]
    MissingInput(String),

    /// The card template skeleton or stylesheet could not be read
    #[error("Card template asset missing: {0}")]
    TemplateUnavailable(String),

    /// The headless browser could not be launched
    #[error("Render engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The render engine did not reach readiness in time
    #[error("Render timed out after {0}ms")]
    RenderTimeout(u64),

    /// Any other failure reported by the render engine
    #[error("Rendering failed: {0}")]
    RenderFailed(String),

    /// Invalid service configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure is attributable to the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::MissingInput(_))
    }
}
