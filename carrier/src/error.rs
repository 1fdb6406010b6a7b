// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Error definitions/handling.

use crate::backend::TaskState;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors in the enclave-carrier crate.
#[derive(Error, Debug)]
pub enum CarrierError {
    /// Error emanating from standard I/O.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Errors relating to JSON processing of the bundle's process specification.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// Errors relating to the shim configuration file.
    #[error(transparent)]
    ConfigError(#[from] toml::de::Error),

    /// Errors surfaced by the container-management backend.
    #[error(transparent)]
    BackendError(#[from] crate::backend::error::BackendError),

    /// The bundle's process specification is present but unusable.
    #[error("the bundle process spec at {path} is unusable: {reason}")]
    BadBundleSpec {
        /// Path to the offending spec document.
        path: PathBuf,
        /// Why the spec cannot be used.
        reason: String,
    },

    /// A pipeline stage was invoked without a provisioned helper container.
    #[error("no active build task; the helper container has not been provisioned")]
    NoActiveTask,

    /// A command executed inside the helper container exited with a non-zero code.
    #[error("process exited abnormally. exit code: {code}, error: {detail}")]
    CommandFailed {
        /// The process exit code.
        code: u32,
        /// The backend's own failure detail, if any was recorded.
        detail: String,
    },

    /// The helper task reported a non-zero exit status while being torn down.
    #[error("task {task_id} exited abnormally. exit code: {code}, task status: {state:?}")]
    AbnormalTaskExit {
        /// The helper task's identifier.
        task_id: String,
        /// The reported exit status.
        code: u32,
        /// The task state at the time of the observation.
        state: TaskState,
    },

    /// A bounded operation did not complete within its deadline.
    #[error("timed out after {timeout:?} while {operation}")]
    DeadlineExceeded {
        /// What the carrier was waiting for.
        operation: &'static str,
        /// The deadline that expired.
        timeout: Duration,
    },
}

/// A Result type with the Err variant set as a CarrierError.
pub type Result<T> = std::result::Result<T, CarrierError>;
