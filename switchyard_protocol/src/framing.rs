// Length-delimited framing for relay traffic.
//
// Each frame is a 4-byte big-endian length followed by that many payload
// bytes. `write_frame` / `read_frame` move raw bytes; `send` / `recv` layer
// serde_json on top for the `ClientMessage` / `ServerMessage` enums, which is
// what both the relay and the client session use.
//
// Frames are small: a turn carries a handful of encoded command packets, each
// a few hundred bytes at most. `MAX_FRAME_SIZE` (1 MB) bounds the allocation a
// hostile length prefix can cause.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{self, Read, Write};

/// Largest frame either side will write or accept.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

fn too_large(kind: io::ErrorKind, len: usize) -> io::Error {
    io::Error::new(
        kind,
        format!("frame of {len} bytes exceeds the {MAX_FRAME_SIZE} byte limit"),
    )
}

/// Write one frame and flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= MAX_FRAME_SIZE)
        .ok_or_else(|| too_large(io::ErrorKind::InvalidInput, payload.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read one frame. A stream that closes mid-frame yields `UnexpectedEof`;
/// an oversized length prefix yields `InvalidData` before anything is
/// allocated.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let len = u32::from_be_bytes(prefix);
    if len > MAX_FRAME_SIZE {
        return Err(too_large(io::ErrorKind::InvalidData, len as usize));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Serialize `msg` as JSON and write it as one frame.
pub fn send<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(io::Error::other)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it. Malformed JSON is `InvalidData`.
pub fn recv<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let payload = read_frame(reader)?;
    serde_json::from_slice(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
