use thiserror::Error;

use crate::domain::{ExpenseId, ValidationErrors};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid expense: {0}")]
    Validation(ValidationErrors),

    #[error("Expense not found: {0}")]
    NotFound(ExpenseId),

    #[error("Photo error: {0}")]
    PhotoIo(String),

    #[error("Geocoder setup failed: {0}")]
    Geocoder(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// Validation messages, if this is a validation failure.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            AppError::Validation(errors) => Some(errors.messages()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}
