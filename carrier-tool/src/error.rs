// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Error definitions/handling.

use thiserror::Error;

use std::path::PathBuf;

/// Errors in carrier-tool
#[derive(Error, Debug)]
pub enum Error {
    /// Error emanating from standard I/O.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// Errors surfaced by the enclave build and signing pipeline.
    #[error(transparent)]
    CarrierError(#[from] enclave_carrier::error::CarrierError),

    /// Errors related to RSA operations
    #[error(transparent)]
    RsaError(#[from] rsa::errors::Error),

    /// Error emanating from the carrier-tool itself.
    #[error(transparent)]
    ToolError(#[from] ToolErrorKind),
}

/// Errors originating in the carrier-tool itself.
#[derive(Error, Debug)]
pub enum ToolErrorKind {
    /// A path reported by the pipeline does not lie under the helper container's
    /// rootfs mount, so it has no host-side counterpart.
    #[error("The path {0} is outside the helper container's rootfs")]
    PathOutsideRootfs(PathBuf),

    /// The public part of the development signing key pair could not be encoded.
    #[error("Failed to encode the public signing key: {0}")]
    KeyEncoding(String),
}

/// A Result type with the Err variant set as a carrier-tool Error
pub type Result<T> = std::result::Result<T, Error>;
