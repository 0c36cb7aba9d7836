//! Compressed frame codec.
//!
//! Every compressed chunk on the wire is prefixed by a checksum and a header:
//!
//! ```text
//! ┏━━━━━━━━━━┳━━━━━━━━┳━━━━━━━━━━━━━━━━━┳━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━┓
//! ┃ checksum ┃ method ┃ compressed size ┃ decompressed size ┃ payload ┃
//! ┣━━━━━━━━━━╋━━━━━━━━╋━━━━━━━━━━━━━━━━━╋━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━┫
//! ┃   u128   ┃   u8   ┃     u32 (LE)    ┃      u32 (LE)     ┃  [u8]   ┃
//! ┗━━━━━━━━━━┻━━━━━━━━┻━━━━━━━━━━━━━━━━━┻━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━┛
//! ```
//!
//! The compressed size counts the 9 byte header (method and both sizes) plus the
//! payload, but not the checksum. The checksum is [CityHash128][cityhash] over
//! the header and the payload.
use bytes::{BufMut, BytesMut};
use std::fmt;

use crate::binary::DecodeError;

mod cityhash;

pub use cityhash::{Hash128, city_hash128};

/// Size of the checksum field.
pub const CHECKSUM_SIZE: usize = 16;

/// Size of method, compressed size and decompressed size fields.
pub const HEADER_SIZE: usize = 1 + 4 + 4;

/// Maximum amount of uncompressed bytes put in a single outbound frame.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Largest compressed or decompressed size accepted in an inbound frame.
pub const MAX_INBOUND_FRAME_SIZE: usize = 1 << 30;

/// Highest ratio an LZ4 block can decompress to.
const LZ4_MAX_RATIO: usize = 255;

/// Compression method code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    None,
    Lz4,
    /// Recognized but not supported.
    Zstd,
}

impl Method {
    pub const fn code(self) -> u8 {
        match self {
            Method::None => 0x02,
            Method::Lz4 => 0x82,
            Method::Zstd => 0x90,
        }
    }

    pub const fn from_code(code: u8) -> Option<Method> {
        match code {
            0x02 => Some(Method::None),
            0x82 => Some(Method::Lz4),
            0x90 => Some(Method::Zstd),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::None => f.write_str("NONE"),
            Method::Lz4 => f.write_str("LZ4"),
            Method::Zstd => f.write_str("ZSTD"),
        }
    }
}

/// Parsed checksum and header of a compressed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub checksum: Hash128,
    pub method: u8,
    /// Header plus payload size.
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl FrameHeader {
    /// Parse the frame header at the start of `raw`.
    ///
    /// Returns [`DecodeError::Incomplete`] when `raw` is shorter than checksum and header.
    pub fn parse(raw: &[u8]) -> Result<FrameHeader, DecodeError> {
        if raw.len() < CHECKSUM_SIZE + HEADER_SIZE {
            return Err(DecodeError::Incomplete { expect: CHECKSUM_SIZE + HEADER_SIZE });
        }

        let u64_at = |at: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&raw[at..at + 8]);
            u64::from_le_bytes(b)
        };
        let u32_at = |at: usize| {
            let mut b = [0u8; 4];
            b.copy_from_slice(&raw[at..at + 4]);
            u32::from_le_bytes(b)
        };

        let header = FrameHeader {
            checksum: Hash128 { low: u64_at(0), high: u64_at(8) },
            method: raw[CHECKSUM_SIZE],
            compressed_size: u32_at(CHECKSUM_SIZE + 1),
            decompressed_size: u32_at(CHECKSUM_SIZE + 5),
        };

        if (header.compressed_size as usize) < HEADER_SIZE {
            return Err(DecodeError::FrameSize {
                expect: HEADER_SIZE,
                found: header.compressed_size as usize,
            });
        }
        for size in [header.compressed_size, header.decompressed_size] {
            if size as usize > MAX_INBOUND_FRAME_SIZE {
                return Err(DecodeError::invalid(format!(
                    "frame size {size} exceeds {MAX_INBOUND_FRAME_SIZE}"
                )));
            }
        }

        Ok(header)
    }

    /// Total size of the frame on the wire, including checksum.
    pub fn frame_len(&self) -> usize {
        CHECKSUM_SIZE + self.compressed_size as usize
    }
}

/// Write `payload` as one frame into `out`.
///
/// With [`Method::Lz4`], payload is written uncompressed if compression does not
/// make it smaller. [`Method::Zstd`] is not supported and falls back to [`Method::None`].
pub fn encode(method: Method, payload: &[u8], out: &mut BytesMut) {
    let compressed = match method {
        Method::Lz4 => Some(lz4_flex::block::compress(payload)).filter(|c| c.len() < payload.len()),
        Method::None | Method::Zstd => None,
    };

    let (method, body) = match &compressed {
        Some(c) => (Method::Lz4, c.as_slice()),
        None => (Method::None, payload),
    };

    let offset = out.len();
    out.reserve(CHECKSUM_SIZE + HEADER_SIZE + body.len());

    // checksum placeholder, filled once header and body are in place
    out.put_bytes(0, CHECKSUM_SIZE);
    out.put_u8(method.code());
    out.put_u32_le(frame_size(HEADER_SIZE + body.len()));
    out.put_u32_le(frame_size(payload.len()));
    out.put_slice(body);

    let hash = city_hash128(&out[offset + CHECKSUM_SIZE..]);
    let mut checksum = &mut out[offset..offset + CHECKSUM_SIZE];
    checksum.put_u64_le(hash.low);
    checksum.put_u64_le(hash.high);
}

fn frame_size(len: usize) -> u32 {
    // outbound frames are capped far below u32::MAX by `MAX_FRAME_SIZE`
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Decode one frame from the start of `raw`.
///
/// Returns the decompressed payload and the number of raw bytes consumed.
///
/// Returns [`DecodeError::Incomplete`] if `raw` does not contain the whole frame.
pub fn decode(raw: &[u8]) -> Result<(Vec<u8>, usize), DecodeError> {
    let header = FrameHeader::parse(raw)?;
    let frame_len = header.frame_len();

    if raw.len() < frame_len {
        return Err(DecodeError::Incomplete { expect: frame_len });
    }

    let checksummed = &raw[CHECKSUM_SIZE..frame_len];
    let found = city_hash128(checksummed);
    if found != header.checksum {
        return Err(DecodeError::Checksum { expect: header.checksum, found });
    }

    let body = &checksummed[HEADER_SIZE..];
    let size = header.decompressed_size as usize;

    let payload = match Method::from_code(header.method) {
        Some(Method::None) => {
            if body.len() != size {
                return Err(DecodeError::FrameSize { expect: size, found: body.len() });
            }
            body.to_vec()
        },
        Some(Method::Lz4) => {
            if size > body.len().saturating_mul(LZ4_MAX_RATIO) {
                return Err(DecodeError::invalid(format!(
                    "lz4 frame of {} bytes cannot hold {size} bytes",
                    body.len()
                )));
            }
            let payload = lz4_flex::block::decompress(body, size)
                .map_err(|err| DecodeError::Lz4(err.to_string()))?;
            if payload.len() != size {
                return Err(DecodeError::FrameSize { expect: size, found: payload.len() });
            }
            payload
        },
        Some(Method::Zstd) | None => return Err(DecodeError::UnsupportedCompression(header.method)),
    };

    Ok((payload, frame_len))
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 7) as u8).collect()
    }

    #[test]
    fn lz4_round_trip() {
        let payload = sample(4096);
        let mut out = BytesMut::new();
        encode(Method::Lz4, &payload, &mut out);

        let header = FrameHeader::parse(&out).unwrap();
        assert_eq!(header.method, Method::Lz4.code());
        assert_eq!(header.decompressed_size as usize, payload.len());
        assert_eq!(header.frame_len(), out.len());

        let (decoded, consumed) = decode(&out).unwrap();
        assert_eq!(decoded, payload);
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn none_round_trip() {
        let payload = b"hello frame".to_vec();
        let mut out = BytesMut::new();
        encode(Method::None, &payload, &mut out);

        let header = FrameHeader::parse(&out).unwrap();
        assert_eq!(header.method, 0x02);
        assert_eq!(header.compressed_size as usize, HEADER_SIZE + payload.len());
        assert_eq!(header.decompressed_size as usize, payload.len());

        let (decoded, _) = decode(&out).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn incompressible_falls_back_to_none() {
        let payload = vec![1, 2, 3];
        let mut out = BytesMut::new();
        encode(Method::Lz4, &payload, &mut out);
        assert_eq!(out[CHECKSUM_SIZE], Method::None.code());
        assert_eq!(decode(&out).unwrap().0, payload);
    }

    #[test]
    fn empty_payload() {
        let mut out = BytesMut::new();
        encode(Method::Lz4, &[], &mut out);
        assert_eq!(decode(&out).unwrap().0, Vec::<u8>::new());
    }

    #[test]
    fn truncated_frame_is_incomplete() {
        let mut out = BytesMut::new();
        encode(Method::Lz4, &sample(1000), &mut out);

        assert!(matches!(decode(&out[..10]), Err(DecodeError::Incomplete { expect: 25 })));
        let total = out.len();
        assert!(matches!(
            decode(&out[..total - 1]),
            Err(DecodeError::Incomplete { expect }) if expect == total
        ));
    }

    #[test]
    fn corrupted_checksum() {
        let mut out = BytesMut::new();
        encode(Method::None, b"payload", &mut out);
        out[0] ^= 0xff;
        assert!(matches!(decode(&out), Err(DecodeError::Checksum { .. })));
    }

    fn rechecksum(out: &mut BytesMut) {
        let hash = city_hash128(&out[CHECKSUM_SIZE..]);
        let mut checksum = &mut out[..CHECKSUM_SIZE];
        checksum.put_u64_le(hash.low);
        checksum.put_u64_le(hash.high);
    }

    #[test]
    fn zstd_is_unsupported() {
        let mut out = BytesMut::new();
        encode(Method::None, b"payload", &mut out);
        out[CHECKSUM_SIZE] = Method::Zstd.code();
        rechecksum(&mut out);

        assert!(matches!(decode(&out), Err(DecodeError::UnsupportedCompression(0x90))));
    }

    #[test]
    fn declared_size_mismatch() {
        let mut out = BytesMut::new();
        encode(Method::None, b"payload", &mut out);
        // decompressed size claims one more byte than present
        out[CHECKSUM_SIZE + 5] += 1;
        rechecksum(&mut out);

        assert!(matches!(decode(&out), Err(DecodeError::FrameSize { expect: 8, found: 7 })));
    }

    #[test]
    fn huge_declared_size_is_rejected() {
        let mut out = BytesMut::new();
        encode(Method::None, b"payload", &mut out);
        out[CHECKSUM_SIZE + 1..CHECKSUM_SIZE + 5].copy_from_slice(&u32::MAX.to_le_bytes());

        // rejected from the header alone, before waiting for the body
        assert!(matches!(FrameHeader::parse(&out[..25]), Err(DecodeError::Invalid(_))));
        assert!(matches!(decode(&out), Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn lz4_declared_size_beyond_ratio() {
        let mut out = BytesMut::new();
        encode(Method::Lz4, &sample(4096), &mut out);
        assert_eq!(out[CHECKSUM_SIZE], Method::Lz4.code());
        out[CHECKSUM_SIZE + 5..CHECKSUM_SIZE + 9].copy_from_slice(&200_000_000u32.to_le_bytes());
        rechecksum(&mut out);

        assert!(matches!(decode(&out), Err(DecodeError::Invalid(_))));
    }
}
