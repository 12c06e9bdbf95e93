use std::path::Path;

use sha2::{Digest, Sha256};

use crate::TransferError;

/// Hex-encoded SHA-256 of a file's contents, streamed from disk.
pub fn calculate_file_checksum(path: &Path) -> Result<String, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
