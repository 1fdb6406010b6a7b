// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! The Occlum carrier: builds and signs Occlum-based Intel SGX enclave images.
//!
//! The Occlum build toolchain cannot run inside the target container's root filesystem, so
//! this carrier provisions an ephemeral, privileged helper container from a builder image.
//! The target bundle's rootfs and a staging directory are bind-mounted into the helper, a
//! set of control scripts is staged into the staging directory, and each pipeline stage is
//! an invocation of the carrier control script inside the helper's root task.
//!
//! The helper container is provisioned once, reused across all pipeline stages, and torn
//! down by [Carrier::cleanup] whatever the pipeline outcome.

pub mod scripts;


use crate::backend::{
    Backend, BackendConnector, Container, ContainerOpts, IoOptions, Mount, ProcessSpec, Signal,
    Task, TaskState,
};
use crate::bundle;
use crate::carrier::constants::{
    DEFAULT_ENCLAVE_RUNTIME_ARGS, ENCLAVE_RUNTIME_ARGS_KEY, ENCLAVE_RUNTIME_PATH_KEY,
    ENCLAVE_TYPE_KEY, INTEL_SGX_ENCLAVE_TYPE, OCCLUM_CONFIG_PATH_KEY,
};
use crate::carrier::{
    Carrier, CascadeEnclaveSignatureArgs, CommonArgs, IdSource, RandomIds,
};
use crate::config::Config;
use crate::error::{CarrierError, Result};
use crate::signal::SignalRelay;
use crate::utils;

use async_trait::async_trait;
use tokio::time::Instant;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The namespace used when a creation request does not specify one.
pub const DEFAULT_NAMESPACE: &str = "k8s.io";

const REPLACE_OCCLUM_IMAGE_SCRIPT: &str = "replace_occlum_image.sh";
const CARRIER_SCRIPT_FILE_NAME: &str = "carrier.sh";
const START_SCRIPT_FILE_NAME: &str = "start.sh";
const ROOTFS_DIR_NAME: &str = "rootfs";
const ENCLAVE_DATA_DIR: &str = "data";
const PUBLIC_KEY_FILE_NAME: &str = "public_key.pem";
const SIGNATURE_FILE_NAME: &str = "signature.dat";

const EXEC_FIFO_DIR: &str = "/run/containerd/fifo";
const NAMESPACE_CHECK_TIMEOUT: Duration = Duration::from_secs(60);
const SIGNATURE_COPY_BUFFER_SIZE: usize = 1024 * 4;

// Artifact locations inside the helper container, relative to the instance directory.
// These are a convention shared with the control scripts, not discovered dynamically.
const UNSIGNED_ENCLAVE_RELATIVE_PATH: &str = ".occlum/build/lib/libocclum-libos.so";
const SIGNED_ENCLAVE_RELATIVE_PATH: &str = ".occlum/build/lib/libocclum-libos.signed.so";
const SIGNING_MATERIAL_FILE_NAME: &str = "enclave_sig.dat";
const ENCLAVE_CONFIG_FILE_NAME: &str = "Enclave.xml";

/// The live handles of the provisioned helper container.
///
/// Either the whole set exists or none of it does: the task belongs to the container, the
/// container belongs to the backend connection, and all three are released together by the
/// teardown protocol.
struct HelperResources {
    backend: Box<dyn Backend>,
    container: Box<dyn Container>,
    task: Box<dyn Task>,
}

/// A build session for one Occlum enclave, implementing the [Carrier] contract.
pub struct OcclumCarrier {
    bundle: PathBuf,
    namespace: String,
    config: Config,
    connector: Box<dyn BackendConnector>,
    ids: Box<dyn IdSource>,
    work_dir: String,
    entry_points: Vec<String>,
    occlum_config_path: Option<String>,
    spec: Option<bundle::Spec>,
    helper: Option<HelperResources>,
}

impl OcclumCarrier {
    /// Creates a carrier for the given target bundle.
    ///
    /// `namespace` scopes the helper container on the backend; requests that do not
    /// specify one fall back to [DEFAULT_NAMESPACE]. The connector is the seam through
    /// which the container-management backend is reached.
    pub fn new(
        bundle: PathBuf,
        namespace: Option<String>,
        config: Config,
        connector: Box<dyn BackendConnector>,
    ) -> OcclumCarrier {
        OcclumCarrier {
            bundle,
            namespace: namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            config,
            connector,
            ids: Box::new(RandomIds::new()),
            work_dir: String::new(),
            entry_points: Vec::new(),
            occlum_config_path: None,
            spec: None,
            helper: None,
        }
    }

    /// Replaces the identifier source. Identifiers default to random tokens; tests
    /// substitute a deterministic source.
    pub fn with_id_source(mut self, ids: Box<dyn IdSource>) -> OcclumCarrier {
        self.ids = ids;
        self
    }

    /// The patched bundle process specification, once the bundle has been rewritten.
    pub fn bundle_spec(&self) -> Option<&bundle::Spec> {
        self.spec.as_ref()
    }

    /// Rewrites the target bundle's process specification so the enclave runtime loader
    /// is activated at container start, and records the working directory, entry point
    /// and build-tool configuration path needed by the pipeline stages.
    ///
    /// The merge is non-destructive and the whole operation is idempotent. Any failure
    /// here aborts the session before a single backend resource has been provisioned.
    pub(crate) fn init_bundle_config(&mut self) -> Result<()> {
        let config_path = self.bundle.join("config.json");
        let mut spec = bundle::load_spec(&config_path)?;

        if spec.process.args.is_empty() {
            return Err(CarrierError::BadBundleSpec {
                path: config_path,
                reason: "the process has no entry point".to_string(),
            });
        }
        self.work_dir = spec.process.cwd.clone();
        self.entry_points = spec.process.args.clone();

        let enclave_runtime_path = format!("{}/liberpal-occlum.so", self.work_dir);
        if let Some(occlum_config_path) = bundle::get_env(&spec, OCCLUM_CONFIG_PATH_KEY) {
            self.occlum_config_path = Some(occlum_config_path);
        }
        bundle::update_envs(
            &mut spec,
            &[
                (ENCLAVE_RUNTIME_PATH_KEY, enclave_runtime_path),
                (ENCLAVE_TYPE_KEY, INTEL_SGX_ENCLAVE_TYPE.to_string()),
                (
                    ENCLAVE_RUNTIME_ARGS_KEY,
                    DEFAULT_ENCLAVE_RUNTIME_ARGS.to_string(),
                ),
            ],
            false,
        );
        bundle::save_spec(&config_path, &spec)?;
        self.spec = Some(spec);
        Ok(())
    }

    /// Stages the three control scripts into a new staging directory under the bundle,
    /// with executable permissions. The directory must not already exist: a leftover
    /// staging directory means another session already claimed this bundle.
    fn stage_control_scripts(&self) -> Result<()> {
        let data_dir = self.bundle.join(ENCLAVE_DATA_DIR);
        fs::create_dir(&data_dir)?;

        for (file_name, content) in &[
            (REPLACE_OCCLUM_IMAGE_SCRIPT, scripts::REPLACE_OCCLUM_IMAGE_SCRIPT),
            (CARRIER_SCRIPT_FILE_NAME, scripts::CARRIER_SCRIPT),
            (START_SCRIPT_FILE_NAME, scripts::START_SCRIPT),
        ] {
            let path = data_dir.join(file_name);
            fs::write(&path, content)?;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }

    /// Provisions the helper container on an established backend connection: namespace
    /// check, image pull, script staging, container and task creation, task start.
    ///
    /// On failure every resource created so far is reclaimed best-effort before the
    /// error propagates, so a partially provisioned helper is never left behind.
    async fn provision(
        &mut self,
        backend: &dyn Backend,
    ) -> Result<(Box<dyn Container>, Box<dyn Task>)> {
        create_namespace_if_not_exist(backend, &self.namespace).await?;

        let build_image = self.config.enclave_runtime.occlum.build_image.clone();
        backend.pull_image(&build_image).await?;
        log::debug!(
            "build_unsigned_enclave: pulled image {} successfully",
            build_image
        );

        let container_id = format!("occlum-enclave-builder-{}", self.ids.next_id());
        let snapshot_id = format!("occlum-enclave-builder-snapshot-{}", self.ids.next_id());
        log::debug!(
            "build_unsigned_enclave: container_id: {}, snapshot_id: {}",
            container_id,
            snapshot_id
        );

        self.stage_control_scripts()?;

        let mounts = vec![
            Mount::bind_rw(
                self.bundle.join(ROOTFS_DIR_NAME),
                Path::new("/").join(ROOTFS_DIR_NAME),
            ),
            Mount::bind_rw(
                self.bundle.join(ENCLAVE_DATA_DIR),
                Path::new("/").join(ENCLAVE_DATA_DIR),
            ),
        ];

        let container = backend
            .create_container(ContainerOpts {
                container_id,
                image: build_image,
                snapshot_id,
                process_args: vec![
                    "/bin/bash".to_string(),
                    container_data_path(START_SCRIPT_FILE_NAME)
                        .display()
                        .to_string(),
                ],
                privileged: true,
                mounts,
            })
            .await?;

        let task = match container.new_task(IoOptions::inherited()).await {
            Ok(task) => task,
            Err(error) => {
                if let Err(delete_error) = container.delete_with_snapshot().await {
                    log::error!(
                        "failed to delete container {} after a task creation failure: {}",
                        container.id(),
                        delete_error
                    );
                }
                return Err(error.into());
            }
        };
        log::debug!("build_unsigned_enclave: created task successfully");

        if let Err(error) = task.start().await {
            log::error!("build_unsigned_enclave: start task failed. error: {}", error);
            if let Err(delete_error) = task.delete().await {
                log::error!(
                    "failed to delete task {} after a start failure: {}",
                    task.id(),
                    delete_error
                );
            }
            if let Err(delete_error) = container.delete_with_snapshot().await {
                log::error!(
                    "failed to delete container {} after a start failure: {}",
                    container.id(),
                    delete_error
                );
            }
            return Err(error.into());
        }

        Ok((container, task))
    }

    /// Runs one command to completion inside the helper's root task.
    ///
    /// The container's process specification is cloned, forced non-terminal and given
    /// the requested argument vector. Stdio is inherited through the well-known FIFO
    /// directory. Signals received by the orchestrating process are forwarded to the
    /// in-container process for the duration of the call. Success iff the exit code
    /// is zero.
    async fn exec_command(&mut self, args: Vec<String>) -> Result<()> {
        let helper = self.helper.as_ref().ok_or(CarrierError::NoActiveTask)?;

        let mut process_spec: ProcessSpec = helper.container.spec().await?;
        process_spec.terminal = false;
        process_spec.args = args;

        let exec_id = format!("exec-{}", self.ids.next_id());
        let process = helper
            .task
            .exec(
                &exec_id,
                process_spec,
                IoOptions::with_fifo_dir(PathBuf::from(EXEC_FIFO_DIR)),
            )
            .await?;

        // Begin waiting before the process is started, so the exit of a fast-exiting
        // process is never missed.
        let waiter = {
            let process = Arc::clone(&process);
            tokio::spawn(async move { process.wait().await })
        };
        let relay = SignalRelay::install(Arc::clone(&process))?;

        if let Err(error) = process.start().await {
            log::error!("exec_command: start process failed. error: {}", error);
            relay.stop();
            waiter.abort();
            if let Err(delete_error) = process.delete().await {
                log::error!("exec_command: delete process failed. error: {}", delete_error);
            }
            return Err(error.into());
        }

        let joined = match self.config.enclave_runtime.occlum.exec_timeout() {
            Some(deadline) => match tokio::time::timeout(deadline, waiter).await {
                Ok(joined) => joined,
                Err(_) => {
                    relay.stop();
                    if let Err(kill_error) = process.kill(Signal::Kill).await {
                        log::error!(
                            "exec_command: kill timed-out process failed. error: {}",
                            kill_error
                        );
                    }
                    if let Err(delete_error) = process.delete().await {
                        log::error!(
                            "exec_command: delete process failed. error: {}",
                            delete_error
                        );
                    }
                    return Err(CarrierError::DeadlineExceeded {
                        operation: "waiting for an in-container command to exit",
                        timeout: deadline,
                    });
                }
            },
            None => waiter.await,
        };
        relay.stop();

        let wait_result = match joined {
            Ok(wait_result) => wait_result,
            Err(join_error) => {
                let _ = process.delete().await;
                return Err(crate::backend::error::BackendError::operation(
                    "wait",
                    join_error,
                )
                .into());
            }
        };

        // Deleting the process cleans up its bookkeeping only, not the container.
        if let Err(delete_error) = process.delete().await {
            log::error!("exec_command: delete process failed. error: {}", delete_error);
        }

        let status = wait_result?;
        if status.code != 0 {
            return Err(CarrierError::CommandFailed {
                code: status.code,
                detail: status.detail.unwrap_or_default(),
            });
        }
        log::debug!("exec_command: exec successfully");
        Ok(())
    }

    /// Joins a path expressed relative to the container rootfs onto the rootfs mount
    /// point, tolerating a leading slash on the relative part.
    fn rootfs_path(tail: &str) -> PathBuf {
        Path::new("/")
            .join(ROOTFS_DIR_NAME)
            .join(tail.trim_start_matches('/'))
    }

    /// The path of a file under the session's working directory, as seen through the
    /// helper container's rootfs mount.
    fn rootfs_workdir_path(&self, tail: &str) -> PathBuf {
        Self::rootfs_path(&format!("{}/{}", self.work_dir.trim_matches('/'), tail))
    }
}

#[async_trait]
impl Carrier for OcclumCarrier {
    fn name(&self) -> &'static str {
        "occlum"
    }

    async fn build_unsigned_enclave(&mut self) -> Result<PathBuf> {
        // Initialize the enclave runtime environment variables in the bundle's
        // config.json before any resource is provisioned.
        self.init_bundle_config()?;

        let socket = self.config.containerd.socket.clone();
        let backend = self.connector.connect(&socket, &self.namespace).await?;
        log::debug!("build_unsigned_enclave: connected to the backend successfully");

        match self.provision(backend.as_ref()).await {
            Ok((container, task)) => {
                self.helper = Some(HelperResources {
                    backend,
                    container,
                    task,
                });
            }
            Err(error) => {
                // Nothing has been recorded on the session; release the connection
                // before aborting.
                if let Err(close_error) = backend.close().await {
                    log::error!(
                        "failed to close the backend connection after a provisioning failure: {}",
                        close_error
                    );
                }
                return Err(error);
            }
        }

        let mut cmd = vec![
            "/bin/bash".to_string(),
            container_data_path(CARRIER_SCRIPT_FILE_NAME)
                .display()
                .to_string(),
            "--action".to_string(),
            "buildUnsignedEnclave".to_string(),
            "--entry_point".to_string(),
            self.entry_points[0].clone(),
            "--work_dir".to_string(),
            self.work_dir.clone(),
            "--rootfs".to_string(),
            Path::new("/").join(ROOTFS_DIR_NAME).display().to_string(),
        ];
        if let Some(occlum_config_path) = &self.occlum_config_path {
            cmd.push("--occlum_config_path".to_string());
            cmd.push(Self::rootfs_path(occlum_config_path).display().to_string());
        }
        log::debug!("build_unsigned_enclave: command: {:?}", cmd);
        if let Err(error) = self.exec_command(cmd).await {
            log::error!("build_unsigned_enclave: exec failed. error: {}", error);
            return Err(error);
        }

        Ok(self.rootfs_workdir_path(UNSIGNED_ENCLAVE_RELATIVE_PATH))
    }

    async fn generate_signing_material(&mut self, args: &mut CommonArgs) -> Result<PathBuf> {
        let signing_material = self.rootfs_workdir_path(SIGNING_MATERIAL_FILE_NAME);
        args.config = self.rootfs_workdir_path(ENCLAVE_CONFIG_FILE_NAME);

        let cmd = vec![
            "/bin/bash".to_string(),
            container_data_path(CARRIER_SCRIPT_FILE_NAME)
                .display()
                .to_string(),
            "--action".to_string(),
            "generateSigningMaterial".to_string(),
            "--enclave_config_path".to_string(),
            args.config.display().to_string(),
            "--unsigned_enclave_path".to_string(),
            args.enclave.display().to_string(),
            "--unsigned_material_path".to_string(),
            signing_material.display().to_string(),
        ];
        log::debug!("generate_signing_material: sgx_sign gendata command: {:?}", cmd);
        if let Err(error) = self.exec_command(cmd).await {
            log::error!("generate_signing_material: sgx_sign gendata failed. error: {}", error);
            return Err(error);
        }
        log::debug!("generate_signing_material: sgx_sign gendata successfully");
        Ok(signing_material)
    }

    async fn cascade_enclave_signature(
        &mut self,
        args: &CascadeEnclaveSignatureArgs,
    ) -> Result<PathBuf> {
        let signed_enclave = self.rootfs_workdir_path(SIGNED_ENCLAVE_RELATIVE_PATH);
        let public_key = container_data_path(PUBLIC_KEY_FILE_NAME);
        let signature = container_data_path(SIGNATURE_FILE_NAME);

        // Copy the externally produced verification material into the staging mount.
        // The control script is never invoked unless both copies have succeeded.
        let public_key_host = self
            .bundle
            .join(ENCLAVE_DATA_DIR)
            .join(PUBLIC_KEY_FILE_NAME);
        if let Err(error) =
            utils::copy_file(&args.key, &public_key_host, SIGNATURE_COPY_BUFFER_SIZE).await
        {
            log::error!(
                "cascade_enclave_signature: copy file {} to {} failed. error: {}",
                args.key.display(),
                public_key_host.display(),
                error
            );
            return Err(error.into());
        }
        let signature_host = self.bundle.join(ENCLAVE_DATA_DIR).join(SIGNATURE_FILE_NAME);
        if let Err(error) =
            utils::copy_file(&args.signature, &signature_host, SIGNATURE_COPY_BUFFER_SIZE).await
        {
            log::error!(
                "cascade_enclave_signature: copy file {} to {} failed. error: {}",
                args.signature.display(),
                signature_host.display(),
                error
            );
            return Err(error.into());
        }

        let cmd = vec![
            "/bin/bash".to_string(),
            container_data_path(CARRIER_SCRIPT_FILE_NAME)
                .display()
                .to_string(),
            "--action".to_string(),
            "cascadeEnclaveSignature".to_string(),
            "--enclave_config_path".to_string(),
            args.config.display().to_string(),
            "--unsigned_enclave_path".to_string(),
            args.enclave.display().to_string(),
            "--unsigned_material_path".to_string(),
            args.signing_material.display().to_string(),
            "--signed_enclave_path".to_string(),
            signed_enclave.display().to_string(),
            "--public_key_path".to_string(),
            public_key.display().to_string(),
            "--signature_path".to_string(),
            signature.display().to_string(),
        ];
        log::debug!("cascade_enclave_signature: sgx_sign catsig command: {:?}", cmd);
        if let Err(error) = self.exec_command(cmd).await {
            log::error!("cascade_enclave_signature: sgx_sign catsig failed. error: {}", error);
            return Err(error);
        }
        log::debug!("cascade_enclave_signature: sgx_sign catsig successfully");
        Ok(signed_enclave)
    }

    async fn cleanup(&mut self) -> Result<()> {
        let helper = match self.helper.take() {
            Some(helper) => helper,
            None => return Ok(()),
        };
        let HelperResources {
            backend,
            container,
            task,
        } = helper;

        let occlum = &self.config.enclave_runtime.occlum;
        let wait_result = wait_for_task_exit(
            task.as_ref(),
            occlum.cleanup_poll_interval(),
            occlum.cleanup_timeout(),
        )
        .await;

        // From here on, reclamation is attempted on every path: a failure while
        // signaling or polling the task must not skip container and snapshot deletion
        // or connection closure.
        let mut first_error = wait_result.err();

        if let Err(error) = task.delete().await {
            log::error!("cleanup: delete task {} failed. error: {}", task.id(), error);
            if first_error.is_none() {
                first_error = Some(error.into());
            }
        }
        if let Err(error) = container.delete_with_snapshot().await {
            log::error!(
                "cleanup: delete container {} failed. error: {}",
                container.id(),
                error
            );
            if first_error.is_none() {
                first_error = Some(error.into());
            }
        } else {
            log::debug!("cleanup: deleted container {} successfully", container.id());
        }
        if let Err(error) = backend.close().await {
            log::error!("cleanup: close backend connection failed. error: {}", error);
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                log::debug!("cleanup: cleaned occlum container and task successfully");
                Ok(())
            }
        }
    }
}

/// Signals the helper task to terminate and polls its status until it reports a stopped
/// state, at the given interval and under the given deadline.
///
/// A non-zero exit status observed at any poll is surfaced as an abnormal-exit error. A
/// failed status poll aborts the wait with that error. In every case the caller proceeds
/// to resource reclamation.
async fn wait_for_task_exit(task: &dyn Task, interval: Duration, deadline: Duration) -> Result<()> {
    if let Err(error) = task.kill(Signal::Term).await {
        log::error!("cleanup: kill task {} failed. error: {}", task.id(), error);
        return Err(error.into());
    }

    let started = Instant::now();
    loop {
        let status = task.status().await?;
        if status.exit_status != 0 {
            log::error!(
                "cleanup: task {} exited abnormally. exit code: {}, task status: {:?}",
                task.id(),
                status.exit_status,
                status.state
            );
            return Err(CarrierError::AbnormalTaskExit {
                task_id: task.id().to_string(),
                code: status.exit_status,
                state: status.state,
            });
        }
        if status.state == TaskState::Stopped {
            return Ok(());
        }
        if started.elapsed() >= deadline {
            return Err(CarrierError::DeadlineExceeded {
                operation: "waiting for the helper task to stop",
                timeout: deadline,
            });
        }
        log::debug!("cleanup: task {} status: {:?}", task.id(), status.state);
        tokio::time::sleep(interval).await;
    }
}

/// Ensures the namespace exists on the backend, creating it if absent. Idempotent: a
/// namespace that is already present is not an error. The whole check runs under a fixed
/// deadline so a hung backend cannot block the orchestrator indefinitely.
pub(crate) async fn create_namespace_if_not_exist(
    backend: &dyn Backend,
    namespace: &str,
) -> Result<()> {
    let check = async {
        let namespaces = backend.list_namespaces().await?;
        if namespaces.iter().any(|existing| existing == namespace) {
            return Ok(());
        }
        backend.create_namespace(namespace).await
    };
    match tokio::time::timeout(NAMESPACE_CHECK_TIMEOUT, check).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(CarrierError::DeadlineExceeded {
            operation: "checking the backend namespace",
            timeout: NAMESPACE_CHECK_TIMEOUT,
        }),
    }
}

/// The path of a staged file as seen from inside the helper container.
fn container_data_path(file_name: &str) -> PathBuf {
    Path::new("/").join(ENCLAVE_DATA_DIR).join(file_name)
}
