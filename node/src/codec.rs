//! Frame encoding for N2N messages.
//!
//! Wire format:
//!
//! ```text
//! [4 bytes: payload length (u32-le)] [1 byte: codec tag] [N bytes: payload]
//! ```
//!
//! The codec is chosen per send (JSON for small, human-debuggable messages,
//! bincode for blocks) and recorded in the frame so the receiver does not
//! need to know which endpoint a frame came from.

use {
    crate::error::{NodeError, Result},
    serde::{de::DeserializeOwned, Deserialize, Serialize},
};

/// Length prefix plus codec tag.
pub const FRAME_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Codec {
    Json,
    Bincode,
}

impl Codec {
    pub fn tag(self) -> u8 {
        match self {
            Codec::Json => 0,
            Codec::Bincode => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Codec::Json),
            1 => Ok(Codec::Bincode),
            other => Err(NodeError::UnknownCodec(other)),
        }
    }

    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        Ok(match self {
            Codec::Json => serde_json::to_vec(value)?,
            Codec::Bincode => bincode::serialize(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(self, data: &[u8]) -> Result<T> {
        Ok(match self {
            Codec::Json => serde_json::from_slice(data)?,
            Codec::Bincode => bincode::deserialize(data)?,
        })
    }
}

/// Encode `value` and wrap it in a frame, rejecting payloads over `max_size`.
pub fn encode_framed<T: Serialize>(value: &T, codec: Codec, max_size: usize) -> Result<Vec<u8>> {
    let payload = codec.encode(value)?;
    if payload.len() > max_size {
        return Err(NodeError::MessageTooLarge {
            size: payload.len(),
            max: max_size,
        });
    }
    let len = frame_len(payload.len())?;
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN.saturating_add(payload.len()));
    buf.extend_from_slice(&len.to_le_bytes());
    buf.push(codec.tag());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Payload length as written in the frame header.
pub fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| NodeError::MessageTooLarge {
        size: len,
        max: usize::try_from(u32::MAX).unwrap_or(usize::MAX),
    })
}

/// Split a frame header into payload length and codec.
pub fn read_header(header: &[u8; FRAME_HEADER_LEN]) -> Result<(usize, Codec)> {
    let raw = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = usize::try_from(raw).map_err(|_| NodeError::MessageTooLarge {
        size: usize::MAX,
        max: usize::MAX,
    })?;
    Ok((len, Codec::from_tag(header[4])?))
}

/// Decode a complete frame produced by [`encode_framed`].
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> Result<T> {
    let header: &[u8; FRAME_HEADER_LEN] = frame
        .get(..FRAME_HEADER_LEN)
        .and_then(|h| h.try_into().ok())
        .ok_or(NodeError::TruncatedFrame(frame.len()))?;
    let (len, codec) = read_header(header)?;
    let payload = frame
        .get(FRAME_HEADER_LEN..FRAME_HEADER_LEN.saturating_add(len))
        .ok_or(NodeError::TruncatedFrame(frame.len()))?;
    codec.decode(payload)
}
