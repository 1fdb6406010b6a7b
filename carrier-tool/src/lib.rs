// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Library portion of carrier-tool, the command-line front end of the enclave-carrier
//! crate. It wires the carrier's build and signing pipeline to a CLI, and ships
//! proof-of-concept implementations of the container-management backend and of a
//! detached signer so the whole pipeline can be demonstrated on a bare host.

pub mod cli;
pub mod common;
pub mod error;
pub mod prototype;
pub mod subcommands;
pub mod util;
