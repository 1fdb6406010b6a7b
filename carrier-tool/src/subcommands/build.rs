// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Builds and signs an Occlum enclave image from a compiled application bundle.

use crate::error::Result;
use crate::prototype::local::LocalConnector;
use crate::prototype::signer::DevSigner;
use crate::util;

use enclave_carrier::carrier::occlum::OcclumCarrier;
use enclave_carrier::carrier::{Carrier, CascadeEnclaveSignatureArgs, CommonArgs};
use enclave_carrier::config::{Config, DEFAULT_CONFIGURATION_PATH};

use structopt::StructOpt;

use std::path::PathBuf;

/// Models the options required by the build command.
#[derive(Debug, StructOpt)]
pub struct Build {
    /// The OCI bundle directory of the application to wrap in an enclave. Must contain
    /// a config.json and a rootfs directory.
    #[structopt(short = "b", long = "bundle")]
    bundle: PathBuf,

    /// The backend namespace to provision the helper container in.
    #[structopt(short = "n", long = "namespace")]
    namespace: Option<String>,

    /// Path to the carrier configuration file. Falls back to the default location, and
    /// to built-in defaults when no file exists there.
    #[structopt(short = "c", long = "config")]
    config: Option<PathBuf>,

    /// The output file, which will contain the signed enclave once the process
    /// completes.
    #[structopt(short = "o", long = "out-file")]
    output_file: PathBuf,
}

impl Build {
    /// Runs the full pipeline: build the unsigned enclave, generate the signing
    /// material, sign it with the development signer, cascade the signature, and copy
    /// the signed enclave to the output file.
    pub fn run(&self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_pipeline())
    }

    async fn run_pipeline(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIGURATION_PATH);
                if default.exists() {
                    Config::from_file(&default)?
                } else {
                    Config::default()
                }
            }
        };
        log::set_max_level(config.log_level_filter());

        let mut carrier = OcclumCarrier::new(
            self.bundle.clone(),
            self.namespace.clone(),
            config,
            Box::new(LocalConnector::new()),
        );

        let outcome = self.run_stages(&mut carrier).await;

        // The helper container is torn down whatever the pipeline outcome.
        if let Err(error) = carrier.cleanup().await {
            log::error!("Cleanup failed: {}", error);
            if outcome.is_ok() {
                return Err(error.into());
            }
        }
        outcome
    }

    async fn run_stages(&self, carrier: &mut OcclumCarrier) -> Result<()> {
        log::info!("Building the unsigned enclave...");
        let unsigned = carrier.build_unsigned_enclave().await?;

        log::info!("Generating the signing material...");
        let mut common = CommonArgs {
            config: PathBuf::new(),
            enclave: unsigned.clone(),
        };
        let material = carrier.generate_signing_material(&mut common).await?;

        log::info!("Signing with the development signer...");
        let material_host = util::host_path(&self.bundle, &material)?;
        let material_bytes = std::fs::read(&material_host)?;
        let signer = DevSigner::generate()?;
        let signature = signer.sign_material(&material_bytes)?;

        let signing_dir = self.bundle.join("signing");
        std::fs::create_dir_all(&signing_dir)?;
        let key_path = signing_dir.join("public_key.pem");
        let signature_path = signing_dir.join("signature.dat");
        std::fs::write(&key_path, signer.public_key_pem()?)?;
        std::fs::write(&signature_path, &signature)?;

        log::info!("Cascading the signature onto the enclave...");
        let signed = carrier
            .cascade_enclave_signature(&CascadeEnclaveSignatureArgs {
                config: common.config.clone(),
                enclave: common.enclave.clone(),
                signing_material: material,
                key: key_path,
                signature: signature_path,
            })
            .await?;

        let signed_host = util::host_path(&self.bundle, &signed)?;
        std::fs::copy(&signed_host, &self.output_file)?;
        log::info!("Wrote the signed enclave to {}", self.output_file.display());
        Ok(())
    }
}
