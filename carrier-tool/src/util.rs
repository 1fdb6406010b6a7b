// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Small helpers shared by the subcommands.

use crate::error::{Result, ToolErrorKind};

use std::path::{Path, PathBuf};

/// Maps a path expressed from the helper container's point of view (under its `/rootfs`
/// bind mount) onto the corresponding host path inside the bundle directory.
pub fn host_path(bundle: &Path, container_path: &Path) -> Result<PathBuf> {
    let relative = container_path
        .strip_prefix("/rootfs")
        .map_err(|_| ToolErrorKind::PathOutsideRootfs(container_path.to_path_buf()))?;
    Ok(bundle.join("rootfs").join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_container_paths_into_the_bundle() {
        let mapped = host_path(
            Path::new("/var/lib/bundles/app"),
            Path::new("/rootfs/app/enclave_sig.dat"),
        )
        .unwrap();
        assert_eq!(
            mapped,
            PathBuf::from("/var/lib/bundles/app/rootfs/app/enclave_sig.dat")
        );
    }

    #[test]
    fn rejects_paths_outside_the_rootfs_mount() {
        assert!(host_path(Path::new("/bundle"), Path::new("/data/carrier.sh")).is_err());
    }
}
