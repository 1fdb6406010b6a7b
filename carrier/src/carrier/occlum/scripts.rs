// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! The control scripts staged into the helper container.
//!
//! The scripts are embedded in the crate and written into the bundle's staging directory at
//! provisioning time, so the helper container needs nothing from the host beyond its two
//! bind mounts. `start.sh` is the helper's root process; `carrier.sh` is the entry point of
//! every pipeline stage; `replace_occlum_image.sh` rebuilds the Occlum instance image from
//! the target container's root filesystem.

/// Root process of the helper container. It only has to stay alive while pipeline stages
/// are executed inside the container, and exit cleanly when teardown signals it.
pub const START_SCRIPT: &str = r"#!/bin/bash

trap 'exit 0' SIGTERM SIGINT

while true; do
    sleep 1
done
";

/// Rebuilds the Occlum instance image directory from the target container's root
/// filesystem, so the enclave wraps the filesystem the container would have run directly.
pub const REPLACE_OCCLUM_IMAGE_SCRIPT: &str = r#"#!/bin/bash

set -e

work_dir=$1
rootfs=$2
entry_point=$3

instance_dir="$rootfs$work_dir"

cd "$instance_dir"

rm -rf image
mkdir -p image
cp -a "$rootfs/." image/

# The instance directory lives inside the rootfs; keep the build tree itself out of the
# enclave image.
rm -rf "image$work_dir/.occlum"

if [ ! -e "image$entry_point" ]; then
    echo "replace_occlum_image.sh: entry point $entry_point not found in the image" >&2
    exit 1
fi
"#;

/// Pipeline stage dispatcher. Each stage of the build and signing pipeline is one
/// invocation of this script with an `--action` and the stage's path arguments.
pub const CARRIER_SCRIPT: &str = r#"#!/bin/bash

set -e

action=""
entry_point=""
work_dir=""
rootfs=""
occlum_config_path=""
enclave_config_path=""
unsigned_enclave_path=""
unsigned_material_path=""
signed_enclave_path=""
public_key_path=""
signature_path=""

while [ $# -gt 0 ]; do
    case "$1" in
    --action) action=$2; shift 2 ;;
    --entry_point) entry_point=$2; shift 2 ;;
    --work_dir) work_dir=$2; shift 2 ;;
    --rootfs) rootfs=$2; shift 2 ;;
    --occlum_config_path) occlum_config_path=$2; shift 2 ;;
    --enclave_config_path) enclave_config_path=$2; shift 2 ;;
    --unsigned_enclave_path) unsigned_enclave_path=$2; shift 2 ;;
    --unsigned_material_path) unsigned_material_path=$2; shift 2 ;;
    --signed_enclave_path) signed_enclave_path=$2; shift 2 ;;
    --public_key_path) public_key_path=$2; shift 2 ;;
    --signature_path) signature_path=$2; shift 2 ;;
    *) echo "carrier.sh: unknown option $1" >&2; exit 1 ;;
    esac
done

build_unsigned_enclave() {
    instance_dir="$rootfs$work_dir"
    mkdir -p "$instance_dir"
    cd "$instance_dir"

    if [ ! -d .occlum ]; then
        occlum init
    fi
    if [ -n "$occlum_config_path" ]; then
        cp "$occlum_config_path" Occlum.json
    fi

    /bin/bash /data/replace_occlum_image.sh "$work_dir" "$rootfs" "$entry_point"

    occlum build

    # Expose the generated enclave configuration at the instance root, where the
    # signing-material stage expects it.
    cp .occlum/build/Enclave.xml Enclave.xml
}

generate_signing_material() {
    sgx_sign gendata \
        -enclave "$unsigned_enclave_path" \
        -config "$enclave_config_path" \
        -out "$unsigned_material_path"
}

cascade_enclave_signature() {
    sgx_sign catsig \
        -enclave "$unsigned_enclave_path" \
        -config "$enclave_config_path" \
        -unsigned "$unsigned_material_path" \
        -key "$public_key_path" \
        -sig "$signature_path" \
        -out "$signed_enclave_path"
}

case "$action" in
buildUnsignedEnclave) build_unsigned_enclave ;;
generateSigningMaterial) generate_signing_material ;;
cascadeEnclaveSignature) cascade_enclave_signature ;;
*) echo "carrier.sh: unknown action '$action'" >&2; exit 1 ;;
esac
"#;
