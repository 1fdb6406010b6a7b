// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! This module defines the carrier contract: the capability set a TEE enclave build backend
//! offers to the container shim. The top-level module defines the contract as a trait along
//! with the per-stage argument objects, and the sub-modules implement it per enclave runtime
//! technology. [occlum] is currently the only variant; additional runtimes implement the
//! same contract without changing pipeline callers.
//!
//! A carrier drives a three-stage, detached-signing pipeline:
//!
//! 1. **Build** — produce the unsigned enclave binary inside an ephemeral helper container.
//! 2. **Generate signing material** — derive the data blob an external signer must sign.
//! 3. **Cascade signature** — combine the externally produced signature and public key with
//!    the unsigned enclave to yield the final signed enclave.
//!
//! The signing itself happens between stages 2 and 3, outside the carrier's trust boundary.
//! The build environment only ever sees public verification material and a pre-computed
//! signature; the private key never enters the helper container.

pub mod constants;
pub mod occlum;

use crate::error::Result;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Arguments shared by the signing-material and cascade stages.
///
/// All paths are expressed from the helper container's point of view, i.e. under its
/// `/rootfs` bind mount.
#[derive(Debug, Clone, Default)]
pub struct CommonArgs {
    /// Path to the enclave configuration document. Back-filled by
    /// [Carrier::generate_signing_material] so the cascade stage can reuse it.
    pub config: PathBuf,
    /// Path to the unsigned enclave shared object.
    pub enclave: PathBuf,
}

/// Arguments for the signature cascade stage.
#[derive(Debug, Clone, Default)]
pub struct CascadeEnclaveSignatureArgs {
    /// Path to the enclave configuration document, inside the helper container.
    pub config: PathBuf,
    /// Path to the unsigned enclave shared object, inside the helper container.
    pub enclave: PathBuf,
    /// Path to the signing material, inside the helper container.
    pub signing_material: PathBuf,
    /// Host path of the public part of the signing key pair.
    pub key: PathBuf,
    /// Host path of the detached signature produced by the external signer.
    pub signature: PathBuf,
}

/// The capability set of a TEE enclave build backend.
///
/// One carrier instance manages one build session against one target bundle. The helper
/// resources provisioned by [Carrier::build_unsigned_enclave] are owned exclusively by the
/// session and reused by the later stages; [Carrier::cleanup] releases them and is always
/// safe to call, including when nothing was provisioned.
#[async_trait]
pub trait Carrier: Send {
    /// The name of the enclave runtime this carrier builds for.
    fn name(&self) -> &'static str;

    /// Patches the target bundle, provisions the helper container, and produces the
    /// unsigned enclave. Returns the unsigned enclave's path inside the helper
    /// container.
    async fn build_unsigned_enclave(&mut self) -> Result<PathBuf>;

    /// Generates the signing material for the unsigned enclave. Returns the material's
    /// path and back-fills `args.config` with the enclave configuration path for reuse
    /// by the cascade stage.
    async fn generate_signing_material(&mut self, args: &mut CommonArgs) -> Result<PathBuf>;

    /// Cascades an externally produced signature onto the unsigned enclave. Returns the
    /// signed enclave's path inside the helper container.
    async fn cascade_enclave_signature(
        &mut self,
        args: &CascadeEnclaveSignatureArgs,
    ) -> Result<PathBuf>;

    /// Tears down the helper container and releases every resource the session owns.
    /// Idempotent; a session with nothing provisioned cleans up as a no-op.
    async fn cleanup(&mut self) -> Result<()>;
}

/// A source of collision-resistant identifiers for containers, snapshots and executed
/// processes.
///
/// Injected into carriers so that identifier generation is controllable: the default source
/// is random, test suites substitute a deterministic counter.
pub trait IdSource: Send {
    /// Produces the next identifier token.
    fn next_id(&mut self) -> String;
}

/// The default identifier source: 63-bit random integers in lower-case base-16, from a
/// time-seeded generator. The collision probability within one shim's lifetime is
/// negligible.
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    /// Creates a source seeded from the current time.
    pub fn new() -> RandomIds {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0);
        RandomIds {
            rng: StdRng::seed_from_u64(nanos),
        }
    }
}

impl Default for RandomIds {
    fn default() -> RandomIds {
        RandomIds::new()
    }
}

impl IdSource for RandomIds {
    fn next_id(&mut self) -> String {
        // Drop the sign bit so the token always fits 63 bits, like a non-negative Int63.
        let token: u64 = self.rng.gen::<u64>() >> 1;
        format!("{:x}", token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_fit_63_bits_and_do_not_repeat_immediately() {
        let mut ids = RandomIds::new();
        let first = ids.next_id();
        let second = ids.next_id();
        assert_ne!(first, second);
        for id in [&first, &second] {
            let value = u64::from_str_radix(id, 16).unwrap();
            assert!(value < (1u64 << 63));
        }
    }
}
