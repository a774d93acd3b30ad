// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for themis-client.

use thiserror::Error;

/// Result type using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the client SDK.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never reached the server.
    #[error("transport error: {0}")]
    Transport(String),

    /// Server returned an error response.
    #[error("server error [{status}]: {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// Check run not found.
    #[error("check run not found: {0}")]
    NotFound(String),

    /// Polling exhausted its attempt budget without a terminal status.
    #[error("check run not terminal after {0} poll attempts")]
    Timeout(u32),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}
