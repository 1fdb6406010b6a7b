// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Signal forwarding for in-container command execution.
//!
//! While a command runs inside the helper container, termination signals delivered to the
//! orchestrating process are forwarded live to the in-container process, so that killing the
//! orchestrator also interrupts the build or signing step it is waiting on. The relay is
//! scoped to a single in-flight command: it is installed just before the command starts and
//! torn down deterministically when the command's exit status has been delivered.

use crate::backend::{ExecProcess, Signal};

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use std::io;
use std::sync::Arc;

/// A relay that forwards SIGTERM and SIGINT to one in-container process for as long as it
/// is installed.
///
/// Dropping the relay stops the forwarding; [SignalRelay::stop] does the same explicitly.
pub struct SignalRelay {
    handle: JoinHandle<()>,
}

impl SignalRelay {
    /// Installs the relay for the given process.
    pub fn install(process: Arc<dyn ExecProcess>) -> io::Result<SignalRelay> {
        let mut term = signal(SignalKind::terminate())?;
        let mut int = signal(SignalKind::interrupt())?;

        let handle = tokio::spawn(async move {
            loop {
                let forwarded = tokio::select! {
                    _ = term.recv() => Signal::Term,
                    _ = int.recv() => Signal::Int,
                };
                log::debug!("forwarding signal {:?} to the in-container process", forwarded);
                if let Err(error) = process.kill(forwarded).await {
                    log::error!(
                        "failed to forward signal {:?} to the in-container process: {}",
                        forwarded,
                        error
                    );
                }
            }
        });

        Ok(SignalRelay { handle })
    }

    /// Stops forwarding signals.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
