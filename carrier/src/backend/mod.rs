// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! This module defines the contract between a carrier and the container-management backend
//! that hosts its helper containers. The top-level module defines the contract as traits,
//! together with the small value types that cross the boundary.
//!
//! A carrier only ever needs a narrow slice of what a full container manager offers: connect
//! to the management socket, pull-and-unpack one builder image, make sure a namespace exists,
//! create one privileged container with bind mounts, and drive the lifecycle of its root task
//! and of processes executed inside that task. Everything else (image stores, snapshotters,
//! networking) stays behind the backend's own API and is deliberately not modelled here.
//!
//! Production deployments implement these traits on top of a real container manager such as
//! containerd. The `carrier-tool` crate ships a proof-of-concept implementation that runs the
//! helper as plain host processes, and the test suites use recording fakes.

pub mod error;

use async_trait::async_trait;

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Convenient result alias for this module, where errors are of type [error::BackendError].
pub type Result<T> = std::result::Result<T, error::BackendError>;

/// The subset of POSIX signals a carrier needs to deliver to helper processes.
///
/// Graceful teardown sends [Signal::Term]; the signal relay forwards interrupts received by
/// the orchestrating process; [Signal::Kill] is reserved for force-termination after a
/// deadline has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Int,
    Kill,
}

/// The lifecycle state of a task or of a process executed within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Stopped,
    Paused,
    Unknown,
}

/// A point-in-time status observation for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// The task's current lifecycle state.
    pub state: TaskState,
    /// The exit status of the task's process. Zero until the process has exited
    /// abnormally or has stopped with a non-zero code.
    pub exit_status: u32,
}

/// The exit status of a process executed inside a task, as delivered by the backend once the
/// process has exited.
#[derive(Debug, Clone)]
pub struct ExitStatus {
    /// The process exit code.
    pub code: u32,
    /// Backend-supplied failure detail, if the backend recorded any alongside the exit.
    pub detail: Option<String>,
}

/// A bind mount exposed to a helper container, mirroring the mount entries of an OCI
/// runtime specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Mount point inside the container.
    pub destination: PathBuf,
    /// Mount type; carriers only ever request `bind`.
    pub kind: String,
    /// Source path on the host.
    pub source: PathBuf,
    /// Mount options, e.g. `rbind`, `rw`.
    pub options: Vec<String>,
}

impl Mount {
    /// Builds a read-write recursive bind mount from a host path to a container path.
    pub fn bind_rw(source: PathBuf, destination: PathBuf) -> Mount {
        Mount {
            destination,
            kind: "bind".to_string(),
            source,
            options: vec!["rbind".to_string(), "rw".to_string()],
        }
    }
}

/// The options needed to create a helper container.
///
/// The container is built from a previously pulled image and a fresh snapshot; the image's
/// default process is overridden with `process_args`.
#[derive(Debug, Clone)]
pub struct ContainerOpts {
    /// Collision-resistant identifier for the container.
    pub container_id: String,
    /// Image reference the container is created from. The image must have been pulled
    /// through [Backend::pull_image] on the same connection beforehand.
    pub image: String,
    /// Identifier for the fresh storage snapshot backing the container.
    pub snapshot_id: String,
    /// Argument vector overriding the image's default process.
    pub process_args: Vec<String>,
    /// Whether the container runs privileged. Enclave builds need device and mount
    /// access, so carriers always request this.
    pub privileged: bool,
    /// Bind mounts attached to the container.
    pub mounts: Vec<Mount>,
}

/// A process specification for a task or an executed process, as obtained from
/// [Container::spec] and passed back through [Task::exec].
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    /// Argument vector of the process.
    pub args: Vec<String>,
    /// Environment in OCI `KEY=VALUE` form.
    pub env: Vec<String>,
    /// Working directory of the process.
    pub cwd: String,
    /// Whether the process is attached to a terminal.
    pub terminal: bool,
}

/// Standard I/O routing for a task or executed process.
///
/// Carriers always inherit the orchestrating process's stdio; for executed processes the
/// backend may additionally be told which FIFO directory to route the streams through.
#[derive(Debug, Clone, Default)]
pub struct IoOptions {
    /// Directory holding the I/O FIFOs, when the backend routes inherited stdio
    /// through a well-known FIFO location.
    pub fifo_dir: Option<PathBuf>,
}

impl IoOptions {
    /// Inherited stdio with no FIFO directory override.
    pub fn inherited() -> IoOptions {
        IoOptions { fifo_dir: None }
    }

    /// Inherited stdio routed through the given FIFO directory.
    pub fn with_fifo_dir(fifo_dir: PathBuf) -> IoOptions {
        IoOptions {
            fifo_dir: Some(fifo_dir),
        }
    }
}

/// Establishes connections to a container-management backend.
///
/// Connectors are injected into carriers so that the backend can be swapped without touching
/// the orchestration logic: a containerd connector in production, a local-process connector
/// in the proof-of-concept tool, a recording fake in tests.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Connects to the management socket at the given path, scoping all subsequent
    /// operations to the given namespace.
    async fn connect(&self, socket: &Path, namespace: &str) -> Result<Box<dyn Backend>>;
}

/// One live connection to the container-management backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Lists the namespaces known to the backend.
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// Creates a namespace. Creating a namespace that already exists is an error;
    /// callers check with [Backend::list_namespaces] first.
    async fn create_namespace(&self, namespace: &str) -> Result<()>;

    /// Pulls the image with the given reference and unpacks it so containers can be
    /// created from it.
    async fn pull_image(&self, reference: &str) -> Result<()>;

    /// Creates a container from a pulled image and a fresh snapshot.
    async fn create_container(&self, opts: ContainerOpts) -> Result<Box<dyn Container>>;

    /// Closes the connection. The connection must not be used afterwards.
    async fn close(&self) -> Result<()>;
}

/// A container created through [Backend::create_container].
#[async_trait]
pub trait Container: Send + Sync {
    /// The container's identifier.
    fn id(&self) -> &str;

    /// Returns the container's process specification, for cloning into executed
    /// processes.
    async fn spec(&self) -> Result<ProcessSpec>;

    /// Creates the container's root task with the given stdio routing. The task is
    /// created in the `Created` state and must be started explicitly.
    async fn new_task(&self, io: IoOptions) -> Result<Box<dyn Task>>;

    /// Deletes the container, requesting cleanup of its storage snapshot as well.
    async fn delete_with_snapshot(&self) -> Result<()>;
}

/// The root task (process group) of a container.
#[async_trait]
pub trait Task: Send + Sync {
    /// The task's identifier.
    fn id(&self) -> &str;

    /// Starts the task's root process.
    async fn start(&self) -> Result<()>;

    /// Delivers a signal to the task's root process.
    async fn kill(&self, signal: Signal) -> Result<()>;

    /// Observes the task's current status. This is a pull-based API; callers poll it
    /// when waiting for a state transition.
    async fn status(&self) -> Result<Status>;

    /// Creates a new process inside the running task. The process is created but not
    /// started; callers start it explicitly and wait for its exit.
    async fn exec(
        &self,
        exec_id: &str,
        spec: ProcessSpec,
        io: IoOptions,
    ) -> Result<Arc<dyn ExecProcess>>;

    /// Deletes the task's bookkeeping from the backend. The task must have stopped.
    async fn delete(&self) -> Result<()>;
}

/// A process executed inside an existing task through [Task::exec].
#[async_trait]
pub trait ExecProcess: Send + Sync {
    /// Starts the process.
    async fn start(&self) -> Result<()>;

    /// Delivers a signal to the process.
    async fn kill(&self, signal: Signal) -> Result<()>;

    /// Waits until the process has exited and returns its exit status.
    ///
    /// Implementations must retain the exit status of a fast-exiting process, so that a
    /// wait initiated before or shortly after [ExecProcess::start] never loses the exit.
    async fn wait(&self) -> Result<ExitStatus>;

    /// Deletes the process's bookkeeping from the backend. This cleans up the exec
    /// record only, not the task or the container.
    async fn delete(&self) -> Result<()>;
}
