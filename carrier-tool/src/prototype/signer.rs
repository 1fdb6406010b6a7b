// SPDX-License-Identifier: MIT
// Copyright 2026 Contributors to the Enclave Carrier project.

//! Prototype (proof-of-concept) implementation of the detached signing step.
//!
//! The pipeline's signing-material stage hands out a blob that an external signer must
//! sign before the signature can be cascaded onto the enclave. In production that signer
//! is a key-management service holding the enclave vendor's key. This prototype stands in
//! for it with a throwaway key pair generated on the spot, which is enough to drive the
//! cascade stage and demonstrate the pipeline, and useless for anything else.

use crate::error::{Result, ToolErrorKind};

use pkcs8::ToPublicKey;
use rsa::hash::Hash;
use rsa::{PaddingScheme, PublicKey, RsaPrivateKey};
use sha2::{Digest, Sha256};

const DEV_KEY_BITS: usize = 2048;

/// A development signer over a freshly generated RSA key pair.
///
/// Signs with RSA PKCS#1 v1.5 over a SHA-256 digest of the signing material, which is the
/// scheme the signature cascade expects.
pub struct DevSigner {
    key: RsaPrivateKey,
}

impl DevSigner {
    /// Generates a new signer with a throwaway 2048-bit key pair.
    pub fn generate() -> Result<DevSigner> {
        let mut rng = rand::rngs::OsRng;
        let key = RsaPrivateKey::new(&mut rng, DEV_KEY_BITS)?;
        Ok(DevSigner { key })
    }

    /// Signs the given signing material.
    pub fn sign_material(&self, material: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(material);
        let padding = PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256));
        Ok(self.key.sign(padding, digest.as_slice())?)
    }

    /// The public part of the key pair, PEM-encoded for the cascade stage.
    pub fn public_key_pem(&self) -> Result<String> {
        self.key
            .to_public_key()
            .to_public_key_pem()
            .map_err(|error| ToolErrorKind::KeyEncoding(error.to_string()).into())
    }

    /// Verifies a signature produced by [DevSigner::sign_material].
    pub fn verify(&self, material: &[u8], signature: &[u8]) -> Result<()> {
        let digest = Sha256::digest(material);
        let padding = PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256));
        self.key
            .to_public_key()
            .verify(padding, digest.as_slice(), signature)?;
        Ok(())
    }
}
