// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Individual commands supported by carrier-tool.

//! Subcommand implementations.

mod build;

use crate::error::Result;
use crate::subcommands::build::Build;

use structopt::StructOpt;

/// Command-line interface to carrier-tool operations.
#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Builds and signs an Occlum enclave image from an OCI bundle, running the full
    /// three-stage pipeline against the proof-of-concept local backend and the
    /// development signer.
    Build(Build),
}

impl Subcommand {
    /// Runs the command.
    pub fn run(&self) -> Result<()> {
        match &self {
            Subcommand::Build(cmd) => cmd.run(),
        }
    }
}
