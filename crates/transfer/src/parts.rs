//! Part planning for multipart uploads.
//!
//! The number of signed URLs negotiated for a file fixes its part count;
//! the part size follows from it. Every part except possibly the last
//! has the same length.

use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};

use crate::TransferError;

/// Byte range of one part within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartRange {
    /// Zero-based position among the file's parts.
    pub index: usize,
    pub offset: u64,
    pub len: u64,
}

/// Splits `file_size` bytes into `part_count` contiguous ranges.
///
/// Ranges cover the whole file exactly once. When there are more parts
/// than bytes, trailing parts are empty.
pub fn plan_parts(file_size: u64, part_count: usize) -> Vec<PartRange> {
    if part_count == 0 {
        return Vec::new();
    }

    let part_size = file_size.div_ceil(part_count as u64);
    (0..part_count)
        .map(|index| {
            let offset = (index as u64 * part_size).min(file_size);
            let end = (offset + part_size).min(file_size);
            PartRange {
                index,
                offset,
                len: end - offset,
            }
        })
        .collect()
}

/// Streaming reader over the bytes of one part.
pub type PartReader = Take<File>;

/// Opens `path` positioned at the start of `range`, yielding exactly
/// `range.len` bytes.
///
/// Fails up front when the file is shorter than the range, so a part is
/// never announced with a length its body cannot fill.
pub async fn open_part(path: &Path, range: &PartRange) -> Result<PartReader, TransferError> {
    let mut file = File::open(path).await?;
    let size = file.metadata().await?.len();
    if range.offset + range.len > size {
        return Err(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            format!(
                "part {} ends at byte {} but {} has {size} bytes",
                range.index,
                range.offset + range.len,
                path.display()
            ),
        )
        .into());
    }

    file.seek(SeekFrom::Start(range.offset)).await?;
    Ok(file.take(range.len))
}
