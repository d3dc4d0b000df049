//! Snapshot framing.
//!
//! A snapshot is the whole engine state serialized as one byte sequence:
//!
//! ```text
//! | magic (4) | version (2) | payload_len (4) | payload (CBOR) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The checksum covers every byte before it.
//! Decoding validates the frame completely before the payload is handed to
//! the deserializer, so truncated or damaged input is always an error.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic bytes at the start of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"EDBS";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Header size (magic + version + payload length).
pub const HEADER_SIZE: usize = 4 + 2 + 4;

/// Footer size (checksum).
pub const FOOTER_SIZE: usize = 4;

/// Parsed snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Format version that wrote the snapshot.
    pub version: u16,
    /// Length of the CBOR payload in bytes.
    pub payload_len: u32,
}

impl SnapshotHeader {
    /// Total framed size implied by this header.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.payload_len as usize + FOOTER_SIZE
    }
}

/// Serializes `state` into a framed snapshot.
///
/// # Errors
///
/// Returns an error if the state cannot be serialized or is too large for
/// the 32-bit length field.
pub fn encode_snapshot<T: Serialize>(state: &T) -> CodecResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(state, &mut payload)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;

    let payload_len = u32::try_from(payload.len())
        .map_err(|_| CodecError::encoding_failed("snapshot payload exceeds 4 GiB"))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len() + FOOTER_SIZE);
    buf.extend_from_slice(&SNAPSHOT_MAGIC);
    buf.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&payload);

    let crc = crc32fast::hash(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

/// Reads and validates the header without touching the payload.
///
/// # Errors
///
/// Returns an error on bad magic, an unsupported version or a short input.
pub fn read_header(data: &[u8]) -> CodecResult<SnapshotHeader> {
    if data.len() < SNAPSHOT_MAGIC.len() || data[0..4] != SNAPSHOT_MAGIC {
        return Err(CodecError::InvalidMagic);
    }
    if data.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version > SNAPSHOT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found: version,
            supported: SNAPSHOT_VERSION,
        });
    }
    let payload_len = u32::from_le_bytes([data[6], data[7], data[8], data[9]]);

    Ok(SnapshotHeader {
        version,
        payload_len,
    })
}

/// Validates the frame and deserializes the payload.
///
/// # Errors
///
/// Returns an error if the frame is damaged in any way or the payload does
/// not deserialize into `T`.
pub fn decode_snapshot<T: DeserializeOwned>(data: &[u8]) -> CodecResult<T> {
    let header = read_header(data)?;
    let frame_len = header.frame_len();

    if data.len() < frame_len {
        return Err(CodecError::Truncated {
            expected: frame_len,
            actual: data.len(),
        });
    }
    if data.len() > frame_len {
        return Err(CodecError::TrailingBytes {
            extra: data.len() - frame_len,
        });
    }

    let body_end = frame_len - FOOTER_SIZE;
    let expected = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let actual = crc32fast::hash(&data[..body_end]);
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    ciborium::from_reader(&data[HEADER_SIZE..body_end])
        .map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct State {
        revision: u32,
        rows: BTreeMap<String, Vec<Option<String>>>,
    }

    fn sample() -> State {
        let mut rows = BTreeMap::new();
        rows.insert("a".to_string(), vec![Some("x".to_string()), None]);
        rows.insert("b".to_string(), vec![None, Some("{}".to_string())]);
        State { revision: 3, rows }
    }

    #[test]
    fn frame_layout() {
        let bytes = encode_snapshot(&sample()).unwrap();
        assert_eq!(&bytes[0..4], b"EDBS");
        let header = read_header(&bytes).unwrap();
        assert_eq!(header.version, SNAPSHOT_VERSION);
        assert_eq!(header.frame_len(), bytes.len());
    }

    #[test]
    fn decode_restores_state() {
        let bytes = encode_snapshot(&sample()).unwrap();
        let decoded: State = decode_snapshot(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(
            encode_snapshot(&sample()).unwrap(),
            encode_snapshot(&sample()).unwrap()
        );
    }

    #[test]
    fn bad_magic_rejected() {
        let result = decode_snapshot::<State>(b"XXXXsomething");
        assert_eq!(result, Err(CodecError::InvalidMagic));
    }

    #[test]
    fn empty_input_rejected() {
        assert_eq!(decode_snapshot::<State>(&[]), Err(CodecError::InvalidMagic));
    }

    #[test]
    fn newer_version_rejected() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes[4..6].copy_from_slice(&(SNAPSHOT_VERSION + 1).to_le_bytes());
        assert!(matches!(
            decode_snapshot::<State>(&bytes),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn flipped_payload_bit_fails_checksum() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes[HEADER_SIZE + 1] ^= 0x40;
        assert!(matches!(
            decode_snapshot::<State>(&bytes),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = encode_snapshot(&sample()).unwrap();
        bytes.push(0);
        assert_eq!(
            decode_snapshot::<State>(&bytes),
            Err(CodecError::TrailingBytes { extra: 1 })
        );
    }

    #[test]
    fn wrong_shape_is_decoding_error() {
        let bytes = encode_snapshot(&vec![1u8, 2, 3]).unwrap();
        assert!(matches!(
            decode_snapshot::<State>(&bytes),
            Err(CodecError::DecodingFailed { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_truncation_is_an_error(cut in 0usize..10_000) {
            let bytes = encode_snapshot(&sample()).unwrap();
            let cut = cut % bytes.len();
            prop_assert!(decode_snapshot::<State>(&bytes[..cut]).is_err());
        }
    }
}
