// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! The enclave-carrier crate contains the orchestration logic for building and signing
//! trusted-execution-environment (TEE) enclave images as part of launching a confidential
//! container.
//!
//! The enclave binary cannot be produced inside the target container's own root filesystem,
//! because the build toolchain needs a different, trusted execution environment. Instead, a
//! carrier provisions a short-lived, privileged helper container from a builder image, drives
//! a multi-stage build/sign pipeline inside it, and retrieves the resulting artifacts back
//! into the target container's bundle.
//!
//! The pipeline is a two-phase, detached-signing protocol: the helper container produces the
//! unsigned enclave and its signing material, an external signer (outside this crate's trust
//! boundary) signs the material, and the carrier cascades the resulting signature back into
//! the enclave. The private signing key never enters the build environment.

pub mod backend;
pub mod bundle;
pub mod carrier;
pub mod config;
pub mod error;
pub mod signal;
pub mod utils;
