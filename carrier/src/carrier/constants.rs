// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! Constants shared between carrier implementations and the shim: the environment variable
//! names recognized on a bundle's process specification, and the values the bundle rewriter
//! merges into it.

/// Environment variable naming the enclave runtime loader library inside the container.
pub const ENCLAVE_RUNTIME_PATH_KEY: &str = "ENCLAVE_RUNTIME_PATH";

/// Environment variable naming the enclave technology the runtime loader should use.
pub const ENCLAVE_TYPE_KEY: &str = "ENCLAVE_TYPE";

/// Environment variable carrying the arguments passed to the enclave runtime loader.
pub const ENCLAVE_RUNTIME_ARGS_KEY: &str = "ENCLAVE_RUNTIME_ARGS";

/// Environment variable through which a bundle declares its build-tool configuration
/// path (relative to the container root filesystem).
pub const OCCLUM_CONFIG_PATH_KEY: &str = "OCCLUM_CONFIG_PATH";

/// The enclave type value for Intel SGX enclaves.
pub const INTEL_SGX_ENCLAVE_TYPE: &str = "IntelSGX";

/// The default arguments passed to the enclave runtime loader.
pub const DEFAULT_ENCLAVE_RUNTIME_ARGS: &str = "./";
