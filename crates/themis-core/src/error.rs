// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for themis-core.
//!
//! Provides a unified error type that maps to HTTP error responses.

use std::fmt;

/// Result type using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur during request processing.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoreError {
    /// Check run was not found in the database.
    CheckNotFound {
        /// The check run ID that was not found.
        check_run_id: String,
    },

    /// Input validation failed.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// Caller credential is missing or invalid.
    AuthError {
        /// Why the credential was rejected.
        reason: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl CoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CheckNotFound { .. } => "CHECK_NOT_FOUND",
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::AuthError { .. } => "AUTH_ERROR",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }

    /// HTTP status code this error surfaces as.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::CheckNotFound { .. } => 404,
            Self::ValidationError { .. } => 400,
            Self::AuthError { .. } => 401,
            Self::DatabaseError { .. } => 500,
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckNotFound { check_run_id } => {
                write!(f, "Check run '{}' not found", check_run_id)
            }
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::AuthError { reason } => {
                write!(f, "Authentication failed: {}", reason)
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::DatabaseError {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}
