//! Chunk stream compression and decompression handling.
//!
//! Compressed entries are stored as a chunk stream:
//!
//! | Field | Size | Description |
//! |-------|------|-------------|
//! | Total size | 4 bytes | Inflated length of the whole entry |
//! | Chunk size | 4 bytes | Length of the following zlib stream, `0` ends the stream |
//! | Chunk data | chunk size | Zlib stream of at most [`MAX_CHUNK_SIZE`] raw bytes |
//!
//! The chunk size and chunk data pair repeats until a chunk size of zero. Both length
//! fields use the byte order passed to [`encode`] and [`decode`].

use std::io::{Cursor, Read, Write};

use binrw::Endian;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use tracing::{instrument, trace};

use crate::error::{Error, FormatError, Result};
use crate::types::{patch_i32, read_i32, write_i32};

/// Largest number of raw bytes compressed into a single chunk
pub const MAX_CHUNK_SIZE: usize = 0x8000;

/// Frame `data` as a chunk stream
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn encode(data: &[u8], endian: Endian) -> Result<Vec<u8>> {
    let total = i32::try_from(data.len())
        .map_err(|_| Error::CustomError(format!("{} bytes cannot be framed", data.len())))?;

    let mut framed = Vec::with_capacity(data.len() / 2 + 8);
    write_i32(&mut framed, total, endian)?;

    for chunk in data.chunks(MAX_CHUNK_SIZE) {
        let size_at = framed.len();
        write_i32(&mut framed, 0, endian)?;

        let mut encoder = ZlibEncoder::new(&mut framed, Compression::best());
        encoder.write_all(chunk)?;
        encoder.finish()?;

        let compressed = framed.len() - size_at - 4;
        trace!(raw = chunk.len(), compressed, "wrote chunk");
        // A zlib stream of at most MAX_CHUNK_SIZE input bytes always fits an i32.
        patch_i32(&mut framed[size_at..size_at + 4], compressed as i32, endian);
    }

    write_i32(&mut framed, 0, endian)?;

    Ok(framed)
}

/// Inflate a chunk stream, checking the result against the declared total size
#[instrument(skip(data), fields(size = data.len()), err)]
pub fn decode(data: &[u8], endian: Endian) -> Result<Vec<u8>> {
    let mut reader = Cursor::new(data);
    let total = read_i32(&mut reader, endian)?;

    let mut inflated = Vec::new();
    loop {
        let size = read_i32(&mut reader, endian)?;
        if size == 0 {
            break;
        }

        let start = reader.position() as usize;
        let chunk = usize::try_from(size)
            .ok()
            .and_then(|size| data.get(start..start.checked_add(size)?))
            .ok_or(FormatError::TruncatedChunk { offset: start })?;

        ZlibDecoder::new(chunk).read_to_end(&mut inflated)?;
        reader.set_position((start + chunk.len()) as u64);
    }

    if inflated.len() as i64 != i64::from(total) {
        return Err(Error::ChunkIntegrity {
            expected: total.into(),
            actual: inflated.len(),
        });
    }

    Ok(inflated)
}
