// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Common definitions for the command-line interface.

pub const PROJECT_NAME: &str = "carrier-tool";
pub const PROJECT_DESC: &str =
    "A tool for building and signing Occlum enclave images from OCI bundles";
pub const PROJECT_AUTHOR: &str = "Contributors to the Enclave Carrier project";
pub const PROJECT_VERSION: &str = env!("CARGO_PKG_VERSION");
