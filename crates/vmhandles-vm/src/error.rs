use crate::varhandle::AccessMode;
use thiserror::Error;
use vmhandles_types::TypeError;
use vmhandles_value::{AccessError, StructuralError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HandleError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Unsupported access mode {mode}: {reason}")]
    UnsupportedAccessMode {
        mode: AccessMode,
        reason: &'static str,
    },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
}

impl From<AccessError> for HandleError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Structural(e) => HandleError::Structural(e),
            AccessError::Type(e) => HandleError::Type(e),
        }
    }
}

impl HandleError {
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        HandleError::IllegalArgument(message.into())
    }
}
