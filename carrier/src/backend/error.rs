// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Error definitions for the container-management backend contract.

use thiserror::Error;

/// Errors surfaced by a container-management backend implementation.
///
/// Backends are external collaborators, so the error carries the failed operation and the
/// backend's own message rather than attempting to enumerate every failure mode a container
/// manager might have.
#[derive(Error, Debug)]
pub enum BackendError {
    /// A backend operation failed. The operation name identifies the call site without
    /// needing to re-run with extra logging.
    #[error("backend operation {operation} failed: {message}")]
    Operation {
        /// The name of the failed operation, e.g. `pull_image`.
        operation: &'static str,
        /// The backend's own failure detail.
        message: String,
    },

    /// Error emanating from standard I/O, for backends that are implemented on top of
    /// local processes or sockets.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl BackendError {
    /// Builds an [BackendError::Operation] from an operation name and any displayable
    /// failure detail.
    pub fn operation(operation: &'static str, message: impl std::fmt::Display) -> BackendError {
        BackendError::Operation {
            operation,
            message: message.to_string(),
        }
    }
}
