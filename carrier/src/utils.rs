// Copyright 2026 Contributors to the Enclave Carrier project.
// SPDX-License-Identifier: MIT

//! General-purpose file utilities used throughout the enclave-carrier crate.

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use std::io;
use std::path::Path;

/// Copies a file in buffered chunks of the given size, returning the number of bytes
/// copied. The destination is created, or truncated if it already exists.
pub async fn copy_file(from: &Path, to: &Path, buffer_size: usize) -> io::Result<u64> {
    let mut source = File::open(from).await?;
    let mut destination = File::create(to).await?;

    let mut buffer = vec![0u8; buffer_size];
    let mut copied: u64 = 0;
    loop {
        let read = source.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        destination.write_all(&buffer[..read]).await?;
        copied += read as u64;
    }
    destination.flush().await?;
    Ok(copied)
}
