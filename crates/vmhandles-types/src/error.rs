use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("No field {field} in {class}")]
    NoSuchField { class: String, field: String },

    #[error("Field {class}.{field} has type {actual}, expected {expected}")]
    FieldTypeMismatch {
        class: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Field {class}.{field} is {actual}, expected {expected}")]
    FieldKindMismatch {
        class: String,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Incorrect type - expected {expected}, was {actual}")]
    StoreType { expected: String, actual: String },

    #[error("Expected {expected} but found {actual}")]
    WrongMethodType { expected: String, actual: String },

    #[error("Expected {expected} arguments but found {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Cannot convert {from} to {to}")]
    Conversion { from: String, to: String },

    #[error("{from} cannot be cast to {to}")]
    ClassCast { from: String, to: String },

    #[error("{0} is not an array type")]
    NotAnArray(String),

    #[error("Parameter index {index} out of range for {signature}")]
    ParameterIndex { index: usize, signature: String },

    #[error("void is not allowed as a parameter type")]
    VoidParameter,
}
