// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! This module implements the small slice of OCI bundle handling that a carrier needs: load
//! the process specification document from a bundle, read and merge environment variables on
//! it, and persist it back to the same path.
//!
//! Only the fields a carrier actually inspects are modelled as typed data. Everything else in
//! the document is captured and round-tripped untouched, so that patching the spec never
//! discards configuration written by the container runtime or by other tooling.

use crate::error::Result;

use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// The process section of an OCI runtime specification, with unknown fields preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// Whether the process is attached to a terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,

    /// The argument vector; the first entry is the container's entry point.
    #[serde(default)]
    pub args: Vec<String>,

    /// The environment, as `KEY=VALUE` entries.
    #[serde(default)]
    pub env: Vec<String>,

    /// The working directory of the process inside the container.
    #[serde(default)]
    pub cwd: String,

    /// All remaining fields of the process section, carried through verbatim.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// An OCI runtime specification document, with unknown fields preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    /// The process section.
    pub process: Process,

    /// All remaining top-level fields of the document, carried through verbatim.
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Loads a process specification document from the given path.
pub fn load_spec(path: &Path) -> Result<Spec> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let spec = serde_json::from_reader(reader)?;
    Ok(spec)
}

/// Persists a process specification document back to the given path, replacing the
/// previous contents.
pub fn save_spec(path: &Path, spec: &Spec) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, spec)?;
    Ok(())
}

/// Reads the value of a named environment variable from the spec, if one is present.
pub fn get_env(spec: &Spec, name: &str) -> Option<String> {
    spec.process.env.iter().find_map(|entry| {
        let mut parts = entry.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(key), Some(value)) if key == name => Some(value.to_string()),
            _ => None,
        }
    })
}

/// Merges the given environment variables into the spec.
///
/// When `overwrite` is false the merge is non-destructive: a variable that already has an
/// entry on the spec keeps its existing value. When `overwrite` is true the existing entry
/// is replaced in place.
pub fn update_envs(spec: &mut Spec, envs: &[(&str, String)], overwrite: bool) {
    for (name, value) in envs {
        let existing = spec
            .process
            .env
            .iter()
            .position(|entry| entry.splitn(2, '=').next() == Some(*name));
        match existing {
            Some(index) if overwrite => {
                spec.process.env[index] = format!("{}={}", name, value);
            }
            Some(_) => {}
            None => {
                spec.process.env.push(format!("{}={}", name, value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "ociVersion": "1.0.2",
        "process": {
            "terminal": false,
            "user": { "uid": 0, "gid": 0 },
            "args": ["/bin/app", "--serve"],
            "env": ["PATH=/usr/bin:/bin", "OCCLUM_CONFIG_PATH=/etc/occlum.json"],
            "cwd": "/app"
        },
        "root": { "path": "rootfs" }
    }"#;

    fn sample_spec() -> Spec {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn get_env_finds_present_variable() {
        let spec = sample_spec();
        assert_eq!(
            get_env(&spec, "OCCLUM_CONFIG_PATH"),
            Some("/etc/occlum.json".to_string())
        );
        assert_eq!(get_env(&spec, "NO_SUCH_VARIABLE"), None);
    }

    #[test]
    fn update_envs_is_non_destructive_without_overwrite() {
        let mut spec = sample_spec();
        update_envs(
            &mut spec,
            &[
                ("PATH", "/clobbered".to_string()),
                ("ENCLAVE_TYPE", "IntelSGX".to_string()),
            ],
            false,
        );
        assert_eq!(get_env(&spec, "PATH"), Some("/usr/bin:/bin".to_string()));
        assert_eq!(get_env(&spec, "ENCLAVE_TYPE"), Some("IntelSGX".to_string()));
        // Applying the same merge again must not duplicate entries.
        let before = spec.process.env.clone();
        update_envs(&mut spec, &[("ENCLAVE_TYPE", "IntelSGX".to_string())], false);
        assert_eq!(spec.process.env, before);
    }

    #[test]
    fn update_envs_replaces_with_overwrite() {
        let mut spec = sample_spec();
        update_envs(&mut spec, &[("PATH", "/only".to_string())], true);
        assert_eq!(get_env(&spec, "PATH"), Some("/only".to_string()));
        assert_eq!(
            spec.process.env.iter().filter(|e| e.starts_with("PATH=")).count(),
            1
        );
    }

    #[test]
    fn round_trip_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut spec = load_spec(&path).unwrap();
        update_envs(&mut spec, &[("ENCLAVE_TYPE", "IntelSGX".to_string())], false);
        save_spec(&path, &spec).unwrap();

        let reloaded: serde_json::Value =
            serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(reloaded["ociVersion"], "1.0.2");
        assert_eq!(reloaded["root"]["path"], "rootfs");
        assert_eq!(reloaded["process"]["user"]["uid"], 0);
        assert_eq!(reloaded["process"]["cwd"], "/app");
    }
}
