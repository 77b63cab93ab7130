//! Structured error types for vgrid.
//!
//! Three families of failure exist in the grid core:
//! - validation errors, which keep a pending edit alive,
//! - structural errors, which abort an operation before any mutation,
//! - partial failures, which are not errors at all and are reported through
//!   [`OperationSummary`](crate::editor::OperationSummary).

use crate::field::ValidationErrors;

/// All errors that can occur in the grid core.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A value was rejected by its field.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No cell factory exists for the requested data type.
    #[error("Unsupported field data type: {0}")]
    UnsupportedDataType(String),

    /// A paste target did not map onto a contiguous run of columns.
    #[error("Paste target is not a sequential column range")]
    NonSequentialRange,

    /// A cell is already being edited and must be flushed or reverted first.
    #[error("Another cell is already being edited")]
    EditInProgress,

    /// A flush or revert was requested without an edit in progress.
    #[error("No edit in progress")]
    NoPendingEdit,

    /// Unknown row identity.
    #[error("Row not found: {0}")]
    RowNotFound(String),

    /// Unknown column identity.
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Invalid grid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON (de)serialization failure.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    /// Structural errors abort the operation and are surfaced to the user as a
    /// transient notification.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDataType(_) | Self::NonSequentialRange
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

impl From<ValidationErrors> for GridError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(target_arch = "wasm32")]
impl From<GridError> for wasm_bindgen::JsValue {
    fn from(e: GridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
