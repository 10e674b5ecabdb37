//! Small helpers shared across the job modules.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Media type used for embedded inputs when the caller does not name one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Encodes raw bytes as a base64 `data:` URI.
///
/// Embedded job inputs travel inside the submission body in this form.
pub fn encode_data_uri(data: &[u8], media_type: &str) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(data))
}

/// Splits a byte buffer into consecutive chunks of at most `chunk_size`.
///
/// The returned slices share the underlying buffer. An empty buffer yields
/// no chunks.
pub(crate) fn chunk_bytes(data: &Bytes, chunk_size: usize) -> Vec<Bytes> {
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let end = usize::min(offset + chunk_size, data.len());
        chunks.push(data.slice(offset..end));
        offset = end;
    }
    chunks
}

/// Reads up to `chunk_size` bytes from `reader`.
///
/// Returns `Ok(None)` once the reader is exhausted; a short final chunk is
/// returned as-is.
pub(crate) async fn read_chunk<R>(
    reader: &mut R,
    chunk_size: usize,
) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut filled = 0;
    while filled < chunk_size {
        let read = reader.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    if filled == 0 {
        return Ok(None);
    }
    buffer.truncate(filled);
    Ok(Some(buffer))
}
