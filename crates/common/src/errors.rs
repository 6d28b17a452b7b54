use thiserror::Error;

/// Error types shared by collaborators and services.
#[derive(Error, Debug, PartialEq)]
pub enum CommonError {
    /// The caller supplied an invalid value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Represents an item not being found.
    #[error("Item not found: {0}")]
    NotFound(String),
}
