use thiserror::Error;
use vmhandles_types::TypeError;

/// Failures that depend on where a value lives rather than what it is.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Null reference: {0}")]
    NullReference(String),

    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("Misaligned access of {width} bytes at address {address:#x}")]
    Misaligned { address: usize, width: usize },

    #[error("Buffer is read-only")]
    ReadOnlyBuffer,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccessError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Type(#[from] TypeError),
}
