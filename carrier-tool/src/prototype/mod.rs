// SPDX-License-Identifier: MIT
// Copyright 2026 Contributors to the Enclave Carrier project.

//! This module contains prototype (proof-of-concept) implementations of the facilities the
//! enclave build pipeline needs from its environment.
//!
//! The code in this module is intended for PoC or demonstration deployments only. A real
//! deployment implements the `enclave_carrier` backend contract on top of a container
//! manager such as containerd, and obtains signatures from a proper key-management
//! service.
//!
//! This module includes a backend that runs helper "containers" as plain host processes,
//! with bind mounts approximated by path translation, and a detached signer that
//! generates a throwaway RSA key pair so the full three-stage pipeline can be exercised
//! end to end on a bare host.

pub mod local;
pub mod signer;
