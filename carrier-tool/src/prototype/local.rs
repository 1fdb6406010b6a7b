// SPDX-License-Identifier: MIT
// Copyright 2026 Contributors to the Enclave Carrier project.

//! Prototype (proof-of-concept) implementation of the container-management backend that
//! runs helper "containers" as plain host processes.
//!
//! Bind mounts are approximated by path translation: any command argument that starts
//! with a mount's in-container destination is rewritten to the corresponding host source
//! path before the process is spawned. Image pulls are no-ops, since the processes run
//! straight off the host filesystem. Signals are simplified to a single force-kill; the
//! runner records that a kill was requested so teardown still observes a clean stop.

use enclave_carrier::backend::{
    Backend, BackendConnector, Container, ContainerOpts, ExecProcess, ExitStatus, IoOptions,
    Mount, ProcessSpec, Result, Signal, Status, Task, TaskState,
};

use tokio::process::Command;
use tokio::sync::{watch, Notify};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Connects carriers to the local-process backend. The socket path and namespace are
/// accepted and ignored; there is no daemon on the other end.
pub struct LocalConnector;

impl LocalConnector {
    pub fn new() -> LocalConnector {
        LocalConnector
    }
}

impl Default for LocalConnector {
    fn default() -> LocalConnector {
        LocalConnector::new()
    }
}

#[async_trait::async_trait]
impl BackendConnector for LocalConnector {
    async fn connect(&self, _socket: &Path, namespace: &str) -> Result<Box<dyn Backend>> {
        Ok(Box::new(LocalBackend {
            namespaces: Mutex::new(vec![namespace.to_string()]),
        }))
    }
}

/// One "connection" to the local-process backend. Namespaces are plain bookkeeping.
pub struct LocalBackend {
    namespaces: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Backend for LocalBackend {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        Ok(self.namespaces.lock().unwrap().clone())
    }

    async fn create_namespace(&self, namespace: &str) -> Result<()> {
        let mut namespaces = self.namespaces.lock().unwrap();
        if namespaces.iter().any(|existing| existing == namespace) {
            return Err(enclave_carrier::backend::error::BackendError::operation(
                "create_namespace",
                "namespace already exists",
            ));
        }
        namespaces.push(namespace.to_string());
        Ok(())
    }

    async fn pull_image(&self, reference: &str) -> Result<()> {
        // Processes run straight off the host filesystem.
        log::debug!("local backend: skipping pull of {}", reference);
        Ok(())
    }

    async fn create_container(&self, opts: ContainerOpts) -> Result<Box<dyn Container>> {
        Ok(Box::new(LocalContainer { opts }))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A "container" on the local backend: the recorded creation options, from which tasks
/// are spawned as host processes.
pub struct LocalContainer {
    opts: ContainerOpts,
}

#[async_trait::async_trait]
impl Container for LocalContainer {
    fn id(&self) -> &str {
        &self.opts.container_id
    }

    async fn spec(&self) -> Result<ProcessSpec> {
        Ok(ProcessSpec {
            args: self.opts.process_args.clone(),
            env: Vec::new(),
            cwd: "/".to_string(),
            terminal: false,
        })
    }

    async fn new_task(&self, _io: IoOptions) -> Result<Box<dyn Task>> {
        Ok(Box::new(LocalTask {
            id: format!("{}-task", self.opts.container_id),
            spec: ProcessSpec {
                args: self.opts.process_args.clone(),
                env: Vec::new(),
                cwd: "/".to_string(),
                terminal: false,
            },
            mounts: self.opts.mounts.clone(),
            runner: ProcessRunner::new(),
        }))
    }

    async fn delete_with_snapshot(&self) -> Result<()> {
        Ok(())
    }
}

/// The root process of a local "container".
pub struct LocalTask {
    id: String,
    spec: ProcessSpec,
    mounts: Vec<Mount>,
    runner: ProcessRunner,
}

#[async_trait::async_trait]
impl Task for LocalTask {
    fn id(&self) -> &str {
        &self.id
    }

    async fn start(&self) -> Result<()> {
        self.runner.spawn(&self.spec, &self.mounts)
    }

    async fn kill(&self, _signal: Signal) -> Result<()> {
        // No TERM/KILL distinction locally; the runner records the kill request so
        // the resulting exit still reads as a clean stop.
        self.runner.request_kill();
        Ok(())
    }

    async fn status(&self) -> Result<Status> {
        Ok(match self.runner.poll_exit() {
            None => Status {
                state: TaskState::Running,
                exit_status: 0,
            },
            Some(code) => Status {
                state: TaskState::Stopped,
                exit_status: if self.runner.was_killed() { 0 } else { code },
            },
        })
    }

    async fn exec(
        &self,
        _exec_id: &str,
        spec: ProcessSpec,
        _io: IoOptions,
    ) -> Result<Arc<dyn ExecProcess>> {
        Ok(Arc::new(LocalExecProcess {
            spec,
            mounts: self.mounts.clone(),
            runner: ProcessRunner::new(),
        }))
    }

    async fn delete(&self) -> Result<()> {
        Ok(())
    }
}

/// A process executed "inside" a local task. There is no actual containment; the process
/// shares the task's mount translation and nothing else.
pub struct LocalExecProcess {
    spec: ProcessSpec,
    mounts: Vec<Mount>,
    runner: ProcessRunner,
}

#[async_trait::async_trait]
impl ExecProcess for LocalExecProcess {
    async fn start(&self) -> Result<()> {
        self.runner.spawn(&self.spec, &self.mounts)
    }

    async fn kill(&self, _signal: Signal) -> Result<()> {
        self.runner.request_kill();
        Ok(())
    }

    async fn wait(&self) -> Result<ExitStatus> {
        let code = self.runner.wait().await;
        Ok(ExitStatus { code, detail: None })
    }

    async fn delete(&self) -> Result<()> {
        Ok(())
    }
}

/// Drives one host process: spawns it on demand, delivers a force-kill when asked, and
/// retains the exit code for any number of waiters, however early they subscribed.
struct ProcessRunner {
    exit_tx: watch::Sender<Option<u32>>,
    exit_rx: watch::Receiver<Option<u32>>,
    kill: Arc<Notify>,
    spawned: AtomicBool,
    killed: AtomicBool,
}

impl ProcessRunner {
    fn new() -> ProcessRunner {
        let (exit_tx, exit_rx) = watch::channel(None);
        ProcessRunner {
            exit_tx,
            exit_rx,
            kill: Arc::new(Notify::new()),
            spawned: AtomicBool::new(false),
            killed: AtomicBool::new(false),
        }
    }

    fn spawn(&self, spec: &ProcessSpec, mounts: &[Mount]) -> Result<()> {
        let args = translate_args(&spec.args, mounts);
        if args.is_empty() {
            return Err(enclave_carrier::backend::error::BackendError::operation(
                "spawn",
                "empty argument vector",
            ));
        }
        let mut command = Command::new(&args[0]);
        command.args(&args[1..]);
        for entry in &spec.env {
            if let Some((key, value)) = split_env(entry) {
                command.env(key, value);
            }
        }
        let mut child = command.spawn()?;
        self.spawned.store(true, Ordering::SeqCst);

        let exit_tx = self.exit_tx.clone();
        let kill = Arc::clone(&self.kill);
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill.notified() => {
                    let _ = child.start_kill();
                    child.wait().await
                }
            };
            let code = match status {
                // A signal-terminated process has no code; report it the way a shell
                // would report a SIGKILL.
                Ok(status) => status.code().map(|code| code as u32).unwrap_or(137),
                Err(_) => 1,
            };
            let _ = exit_tx.send(Some(code));
        });
        Ok(())
    }

    fn request_kill(&self) {
        self.killed.store(true, Ordering::SeqCst);
        if !self.spawned.load(Ordering::SeqCst) {
            // Nothing ever ran; report a clean stop so teardown can proceed.
            let _ = self.exit_tx.send(Some(0));
            return;
        }
        self.kill.notify_one();
    }

    async fn wait(&self) -> u32 {
        let mut exit_rx = self.exit_rx.clone();
        loop {
            if let Some(code) = *exit_rx.borrow() {
                return code;
            }
            if exit_rx.changed().await.is_err() {
                return 1;
            }
        }
    }

    fn poll_exit(&self) -> Option<u32> {
        *self.exit_rx.borrow()
    }

    fn was_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }
}

fn translate_args(args: &[String], mounts: &[Mount]) -> Vec<String> {
    args.iter().map(|arg| translate(arg, mounts)).collect()
}

fn translate(arg: &str, mounts: &[Mount]) -> String {
    for mount in mounts {
        let destination = mount.destination.to_string_lossy();
        if let Some(rest) = arg.strip_prefix(destination.as_ref()) {
            if rest.is_empty() || rest.starts_with('/') {
                return format!("{}{}", mount.source.display(), rest);
            }
        }
    }
    arg.to_string()
}

fn split_env(entry: &str) -> Option<(&str, &str)> {
    let mut parts = entry.splitn(2, '=');
    Some((parts.next()?, parts.next()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts_with_mounts(mounts: Vec<Mount>) -> ContainerOpts {
        ContainerOpts {
            container_id: "local-test".to_string(),
            image: "unused".to_string(),
            snapshot_id: "local-test-snapshot".to_string(),
            process_args: vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                "sleep 30".to_string(),
            ],
            privileged: false,
            mounts,
        }
    }

    async fn make_task(mounts: Vec<Mount>) -> Box<dyn Task> {
        let backend = LocalConnector::new()
            .connect(Path::new("/nonexistent.sock"), "default")
            .await
            .unwrap();
        let container = backend
            .create_container(opts_with_mounts(mounts))
            .await
            .unwrap();
        container.new_task(IoOptions::inherited()).await.unwrap()
    }

    fn sh(script: &str) -> ProcessSpec {
        ProcessSpec {
            args: vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()],
            env: Vec::new(),
            cwd: "/".to_string(),
            terminal: false,
        }
    }

    #[tokio::test]
    async fn exec_reports_the_exit_code() {
        let task = make_task(Vec::new()).await;

        let process = task
            .exec("exec-ok", sh("exit 0"), IoOptions::inherited())
            .await
            .unwrap();
        process.start().await.unwrap();
        assert_eq!(process.wait().await.unwrap().code, 0);

        let process = task
            .exec("exec-fail", sh("exit 3"), IoOptions::inherited())
            .await
            .unwrap();
        process.start().await.unwrap();
        assert_eq!(process.wait().await.unwrap().code, 3);
    }

    #[tokio::test]
    async fn a_wait_subscribed_before_start_still_sees_the_exit() {
        let task = make_task(Vec::new()).await;
        let process = task
            .exec("exec-early-wait", sh("exit 7"), IoOptions::inherited())
            .await
            .unwrap();

        let waiter = {
            let process = Arc::clone(&process);
            tokio::spawn(async move { process.wait().await })
        };
        process.start().await.unwrap();
        assert_eq!(waiter.await.unwrap().unwrap().code, 7);
    }

    #[tokio::test]
    async fn mount_destinations_translate_to_host_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hello").unwrap();
        let mounts = vec![Mount::bind_rw(
            dir.path().to_path_buf(),
            "/data".into(),
        )];
        let task = make_task(mounts).await;

        let spec = ProcessSpec {
            args: vec!["/bin/cat".to_string(), "/data/hello.txt".to_string()],
            env: Vec::new(),
            cwd: "/".to_string(),
            terminal: false,
        };
        let process = task
            .exec("exec-cat", spec, IoOptions::inherited())
            .await
            .unwrap();
        process.start().await.unwrap();
        assert_eq!(process.wait().await.unwrap().code, 0);
    }

    #[tokio::test]
    async fn a_killed_task_reports_a_clean_stop() {
        let task = make_task(Vec::new()).await;
        task.start().await.unwrap();
        assert_eq!(task.status().await.unwrap().state, TaskState::Running);

        task.kill(Signal::Term).await.unwrap();
        let status = loop {
            let status = task.status().await.unwrap();
            if status.state == TaskState::Stopped {
                break status;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        };
        assert_eq!(status.exit_status, 0);
    }
}
