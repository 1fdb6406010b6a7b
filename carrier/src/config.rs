// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Shim configuration handling.
//!
//! The carrier is configured through a TOML file providing the container-management socket
//! path, the builder image reference, log verbosity, and the bounds on the teardown poll
//! loop. A configuration file looks like this:
//!
//! `````toml
//! log_level = "info"
//!
//! [containerd]
//! socket = "/run/containerd/containerd.sock"
//!
//! [enclave_runtime.occlum]
//! build_image = "docker.io/occlum/occlum:latest"
//! cleanup_poll_interval_secs = 1
//! cleanup_timeout_secs = 60
//! `````

use crate::error::Result;

use serde::Deserialize;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// The default location of the shim configuration file.
pub const DEFAULT_CONFIGURATION_PATH: &str = "/etc/enclave-carrier/config.toml";

/// Top-level shim configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log verbosity: one of `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Container-management backend settings.
    pub containerd: ContainerdConfig,

    /// Per-runtime enclave build settings.
    pub enclave_runtime: EnclaveRuntimeConfig,
}

/// Connection settings for the container-management backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerdConfig {
    /// Path of the management socket.
    pub socket: PathBuf,
}

/// Enclave runtime settings, keyed by runtime technology.
#[derive(Debug, Clone, Deserialize)]
pub struct EnclaveRuntimeConfig {
    /// Settings for the Occlum runtime.
    pub occlum: OcclumConfig,
}

/// Build settings for the Occlum enclave runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct OcclumConfig {
    /// Reference of the image used to provision the helper container.
    pub build_image: String,

    /// Interval, in seconds, between task status polls during teardown.
    #[serde(default = "default_cleanup_poll_interval_secs")]
    pub cleanup_poll_interval_secs: u64,

    /// Overall deadline, in seconds, for the teardown poll loop. When the deadline
    /// expires the carrier stops waiting and proceeds to force deletion.
    #[serde(default = "default_cleanup_timeout_secs")]
    pub cleanup_timeout_secs: u64,

    /// Optional deadline, in seconds, on each in-container command execution. Absent by
    /// default: a build is allowed to take as long as it takes.
    #[serde(default)]
    pub exec_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cleanup_poll_interval_secs() -> u64 {
    1
}

fn default_cleanup_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    pub fn from_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Maps the configured log verbosity onto a [log::LevelFilter]. Unrecognized values
    /// fall back to `info`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.log_level.as_str() {
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }
}

impl OcclumConfig {
    /// The teardown poll interval as a [Duration].
    pub fn cleanup_poll_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_poll_interval_secs)
    }

    /// The teardown deadline as a [Duration].
    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_secs(self.cleanup_timeout_secs)
    }

    /// The per-command execution deadline, if one is configured.
    pub fn exec_timeout(&self) -> Option<Duration> {
        self.exec_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    /// A configuration with the conventional defaults, for environments without a
    /// configuration file (tests and the proof-of-concept tool).
    fn default() -> Config {
        Config {
            log_level: default_log_level(),
            containerd: ContainerdConfig {
                socket: PathBuf::from("/run/containerd/containerd.sock"),
            },
            enclave_runtime: EnclaveRuntimeConfig {
                occlum: OcclumConfig {
                    build_image: "docker.io/occlum/occlum:latest".to_string(),
                    cleanup_poll_interval_secs: default_cleanup_poll_interval_secs(),
                    cleanup_timeout_secs: default_cleanup_timeout_secs(),
                    exec_timeout_secs: None,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_configuration() {
        let toml = r#"
            log_level = "debug"

            [containerd]
            socket = "/run/containerd/containerd.sock"

            [enclave_runtime.occlum]
            build_image = "docker.io/occlum/occlum:0.29.7"
            cleanup_poll_interval_secs = 2
            cleanup_timeout_secs = 30
            exec_timeout_secs = 600
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
        assert_eq!(
            config.containerd.socket,
            PathBuf::from("/run/containerd/containerd.sock")
        );
        let occlum = &config.enclave_runtime.occlum;
        assert_eq!(occlum.build_image, "docker.io/occlum/occlum:0.29.7");
        assert_eq!(occlum.cleanup_poll_interval(), Duration::from_secs(2));
        assert_eq!(occlum.cleanup_timeout(), Duration::from_secs(30));
        assert_eq!(occlum.exec_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn applies_defaults_for_omitted_fields() {
        let toml = r#"
            [containerd]
            socket = "/run/containerd/containerd.sock"

            [enclave_runtime.occlum]
            build_image = "docker.io/occlum/occlum:latest"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.log_level, "info");
        let occlum = &config.enclave_runtime.occlum;
        assert_eq!(occlum.cleanup_poll_interval(), Duration::from_secs(1));
        assert_eq!(occlum.cleanup_timeout(), Duration::from_secs(60));
        assert_eq!(occlum.exec_timeout(), None);
    }

    #[test]
    fn unknown_log_levels_fall_back_to_info() {
        let mut config = Config::default();
        config.log_level = "chatty".to_string();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn rejects_a_malformed_file() {
        let result: std::result::Result<Config, _> = toml::from_str("log_level = [");
        assert!(result.is_err());
    }
}
