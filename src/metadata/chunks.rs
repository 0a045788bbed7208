//! Minimal PNG chunk container: enough to read and insert `tEXt` entries
//! without touching image data.
//!
//! Layout after the 8-byte signature, repeated until `IEND`:
//! Length(4, BE) + Type(4) + Data(Length) + CRC32(4, BE over Type + Data)

use std::io::{self, Write};

/// Bytes every PNG file starts with.
pub const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// Chunk type of a Latin-1/UTF-8 text entry.
pub const TEXT_CHUNK: &[u8; 4] = b"tEXt";

/// Chunk type terminating the stream.
pub const END_CHUNK: &[u8; 4] = b"IEND";

/// Longest keyword the container allows.
const MAX_KEYWORD_LEN: usize = 79;

/// Malformed PNG container.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("Not a PNG file (bad signature)")]
    BadSignature,
    #[error("PNG truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("CRC mismatch in `{kind}` chunk")]
    CrcMismatch { kind: String },
    #[error("PNG has no IEND chunk")]
    MissingEnd,
    #[error("Invalid text keyword `{0}`")]
    InvalidKeyword(String),
}

/// One chunk, type and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
}

impl Chunk {
    /// Build a `tEXt` chunk: `keyword NUL text`.
    pub fn text(keyword: &str, text: &str) -> Result<Self, ChunkError> {
        if keyword.is_empty() || keyword.len() > MAX_KEYWORD_LEN || keyword.contains('\0') {
            return Err(ChunkError::InvalidKeyword(keyword.to_string()));
        }
        let mut data = Vec::with_capacity(keyword.len() + 1 + text.len());
        data.extend_from_slice(keyword.as_bytes());
        data.push(0);
        data.extend_from_slice(text.as_bytes());
        Ok(Self {
            kind: *TEXT_CHUNK,
            data,
        })
    }

    /// Split a `tEXt` chunk into keyword and text. `None` for other kinds or
    /// a payload without separator.
    pub fn as_text(&self) -> Option<(String, String)> {
        if &self.kind != TEXT_CHUNK {
            return None;
        }
        let nul = self.data.iter().position(|&b| b == 0)?;
        let keyword = String::from_utf8_lossy(&self.data[..nul]).into_owned();
        let text = String::from_utf8_lossy(&self.data[nul + 1..]).into_owned();
        Some((keyword, text))
    }

    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }

    fn crc(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.kind);
        hasher.update(&self.data);
        hasher.finalize()
    }

    /// Write length, type, data and CRC.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let len = u32::try_from(self.data.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Chunk too large"))?;
        w.write_all(&len.to_be_bytes())?;
        w.write_all(&self.kind)?;
        w.write_all(&self.data)?;
        w.write_all(&self.crc().to_be_bytes())?;
        Ok(())
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ChunkError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or(ChunkError::Truncated { offset })
}

/// Parse every chunk up to and including `IEND`. Trailing bytes are ignored.
pub fn read_chunks(bytes: &[u8]) -> Result<Vec<Chunk>, ChunkError> {
    if bytes.len() < PNG_SIGNATURE.len() || &bytes[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return Err(ChunkError::BadSignature);
    }

    let mut chunks = Vec::new();
    let mut offset = PNG_SIGNATURE.len();
    while offset < bytes.len() {
        let len = read_u32(bytes, offset)? as usize;
        let kind_at = offset + 4;
        let data_at = kind_at + 4;
        let crc_at = data_at
            .checked_add(len)
            .ok_or(ChunkError::Truncated { offset })?;

        let kind: [u8; 4] = bytes
            .get(kind_at..data_at)
            .and_then(|b| b.try_into().ok())
            .ok_or(ChunkError::Truncated { offset: kind_at })?;
        let data = bytes
            .get(data_at..crc_at)
            .ok_or(ChunkError::Truncated { offset: data_at })?
            .to_vec();
        let stored_crc = read_u32(bytes, crc_at)?;

        let chunk = Chunk { kind, data };
        if chunk.crc() != stored_crc {
            return Err(ChunkError::CrcMismatch {
                kind: chunk.kind_str(),
            });
        }

        let is_end = &chunk.kind == END_CHUNK;
        chunks.push(chunk);
        if is_end {
            return Ok(chunks);
        }
        offset = crc_at + 4;
    }
    Err(ChunkError::MissingEnd)
}

/// Serialize a chunk list behind the signature.
pub fn write_chunks(chunks: &[Chunk]) -> io::Result<Vec<u8>> {
    let size = PNG_SIGNATURE.len() + chunks.iter().map(|c| c.data.len() + 12).sum::<usize>();
    let mut out = Vec::with_capacity(size);
    out.extend_from_slice(PNG_SIGNATURE);
    for chunk in chunks {
        chunk.write_to(&mut out)?;
    }
    Ok(out)
}

/// Re-emit `png` with `extra` inserted just before `IEND`.
pub fn insert_before_end(png: &[u8], extra: Vec<Chunk>) -> Result<Vec<u8>, ChunkError> {
    let mut chunks = read_chunks(png)?;
    // read_chunks guarantees IEND is last
    let end = chunks.len() - 1;
    chunks.splice(end..end, extra);
    write_chunks(&chunks).map_err(|_| ChunkError::Truncated { offset: png.len() })
}

/// All `tEXt` entries in file order.
pub fn text_entries(png: &[u8]) -> Result<Vec<(String, String)>, ChunkError> {
    Ok(read_chunks(png)?.iter().filter_map(Chunk::as_text).collect())
}
