//! Primitive binary codec.
//!
//! All integers are little endian. Strings are a varint byte length followed by the
//! raw bytes. Varints are LEB128: 7 bits per byte, least significant group first,
//! `0x80` marks continuation.
//!
//! Both [`Serializer`] and [`Deserializer`] operate in one of two [`Mode`]s. In
//! [`Mode::Direct`] bytes go straight to/from the socket buffer, in
//! [`Mode::Compressed`] they pass through the [frame codec][crate::compress].
use std::{borrow::Cow, fmt, str::Utf8Error};

use crate::compress::Hash128;

mod ser;
mod de;

pub use ser::Serializer;
pub use de::Deserializer;

/// Maximum encoded length of a varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Longest string or binary value accepted from the server.
pub const MAX_BINARY_LEN: usize = 1 << 30;

/// Whether bytes pass through the frame codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Direct,
    Compressed,
}

/// An error when decoding bytes received from the server.
pub enum DecodeError {
    /// Input ended early, decoding can be retried once the raw input reach `expect` bytes.
    Incomplete {
        expect: usize,
    },
    /// Frame size fields disagree with the frame content.
    FrameSize {
        expect: usize,
        found: usize,
    },
    Checksum {
        expect: Hash128,
        found: Hash128,
    },
    Lz4(String),
    UnsupportedCompression(u8),
    Utf8(Utf8Error),
    VarintOverflow,
    Invalid(Cow<'static, str>),
}

impl DecodeError {
    pub(crate) fn invalid(reason: impl Into<Cow<'static, str>>) -> DecodeError {
        DecodeError::Invalid(reason.into())
    }
}

impl From<Utf8Error> for DecodeError {
    fn from(value: Utf8Error) -> Self {
        DecodeError::Utf8(value)
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete { expect } => write!(f, "input ended early, expected at least {expect} bytes"),
            Self::FrameSize { expect, found } => {
                write!(f, "compressed frame size mismatch, expected {expect} bytes, found {found}")
            },
            Self::Checksum { expect, found } => write!(
                f,
                "compressed frame checksum mismatch, expected {:016x}{:016x}, found {:016x}{:016x}",
                expect.high, expect.low, found.high, found.low,
            ),
            Self::Lz4(e) => write!(f, "failed to decompress LZ4 frame: {e}"),
            Self::UnsupportedCompression(m) => write!(f, "unsupported compression method: 0x{m:02x}"),
            Self::Utf8(e) => write!(f, "invalid utf8 string: {e}"),
            Self::VarintOverflow => write!(f, "varint longer than {MAX_VARINT_LEN} bytes"),
            Self::Invalid(reason) => write!(f, "invalid value: {reason}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compress::{self, Method};
    use bytes::BytesMut;

    #[test]
    fn varint_300() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(300);
        assert_eq!(&ser.output()[..], &[0xAC, 0x02]);
    }

    #[test]
    fn varint_round_trip() {
        let values = [0, 1, 0x7f, 0x80, 300, 16_384, u32::MAX as u64, 1 << 62, u64::MAX - 1, u64::MAX];
        let mut ser = Serializer::new(None);
        for v in values {
            ser.write_var_uint(v);
        }
        let out = ser.output().to_vec();
        let mut de = Deserializer::new(&out, false);
        for v in values {
            assert_eq!(de.read_var_uint().unwrap(), v);
        }
        assert_eq!(de.consumed(), out.len());
    }

    #[test]
    fn varint_too_long() {
        let raw = [0xffu8; 11];
        let mut de = Deserializer::new(&raw, false);
        assert!(matches!(de.read_var_uint(), Err(DecodeError::VarintOverflow)));
    }

    #[test]
    fn zigzag_round_trip() {
        let mut ser = Serializer::new(None);
        for v in [0i64, -1, 1, i64::MIN, i64::MAX] {
            ser.write_var_int(v);
        }
        let out = ser.output().to_vec();
        assert_eq!(out[1], 1); // -1
        let mut de = Deserializer::new(&out, false);
        for v in [0i64, -1, 1, i64::MIN, i64::MAX] {
            assert_eq!(de.read_var_int().unwrap(), v);
        }
    }

    #[test]
    fn fixed_width_little_endian() {
        let mut ser = Serializer::new(None);
        ser.write_i32(-123_456);
        ser.write_u16(0x0102);
        ser.write_f64(1.5);
        ser.write_f32(-0.25);
        ser.write_string("héllo");
        ser.write_i128(-2);

        let out = ser.output().to_vec();
        assert_eq!(&out[4..6], &[0x02, 0x01]);

        let mut de = Deserializer::new(&out, false);
        assert_eq!(de.read_i32().unwrap(), -123_456);
        assert_eq!(de.read_u16().unwrap(), 0x0102);
        assert_eq!(de.read_f64().unwrap().to_bits(), 1.5f64.to_bits());
        assert_eq!(de.read_f32().unwrap(), -0.25);
        assert_eq!(de.read_string().unwrap(), "héllo");
        assert_eq!(de.read_i128().unwrap(), -2);
    }

    #[test]
    fn short_read_is_incomplete() {
        let raw = [1u8, 2];
        let mut de = Deserializer::new(&raw, false);
        assert!(matches!(de.read_i32(), Err(DecodeError::Incomplete { expect: 4 })));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut raw = vec![0xffu8; 9];
        raw.push(0x01);
        let mut de = Deserializer::new(&raw, false);
        assert!(matches!(de.read_string(), Err(DecodeError::Invalid(_))));

        let mut ser = Serializer::new(None);
        ser.write_var_uint(MAX_BINARY_LEN as u64 + 1);
        let out = ser.output().to_vec();
        let mut de = Deserializer::new(&out, false);
        assert!(matches!(de.read_binary(), Err(DecodeError::Invalid(_))));
    }

    #[test]
    fn announced_length_waits_for_bytes() {
        let mut ser = Serializer::new(None);
        ser.write_var_uint(1 << 20);
        ser.write_bytes(b"abc");
        let out = ser.output().to_vec();
        let mut de = Deserializer::new(&out, false);
        assert!(matches!(de.read_string(), Err(DecodeError::Incomplete { expect }) if expect == 3 + (1 << 20)));
    }

    #[test]
    fn compressed_announced_length_waits_for_frames() {
        let mut ser = Serializer::new(Some(Method::Lz4));
        ser.switch_mode(Mode::Compressed);
        ser.write_var_uint(1_000_000);
        ser.write_bytes(b"abc");
        ser.switch_mode(Mode::Direct);
        let out = ser.output().to_vec();

        let mut de = Deserializer::new(&out, true);
        de.switch_mode(Mode::Compressed);
        let err = de.read_string().unwrap_err();
        assert!(matches!(err, DecodeError::Incomplete { expect } if expect > out.len()), "{err}");
    }

    #[test]
    fn compressed_mode_round_trip() {
        let mut ser = Serializer::new(Some(Method::Lz4));
        ser.write_var_uint(2);
        ser.write_string("");
        ser.switch_mode(Mode::Compressed);
        for i in 0..10_000 {
            ser.write_i64(i);
        }
        ser.switch_mode(Mode::Direct);
        ser.write_var_uint(4);

        let out = ser.output().to_vec();
        let mut de = Deserializer::new(&out, true);
        assert_eq!(de.read_var_uint().unwrap(), 2);
        assert_eq!(de.read_string().unwrap(), "");
        de.switch_mode(Mode::Compressed);
        for i in 0..10_000 {
            assert_eq!(de.read_i64().unwrap(), i);
        }
        de.switch_mode(Mode::Direct);
        assert_eq!(de.read_var_uint().unwrap(), 4);
        assert_eq!(de.consumed(), out.len());
    }

    #[test]
    fn compressed_read_spans_frames() {
        let mut raw = BytesMut::new();
        compress::encode(Method::Lz4, &[1, 0, 0], &mut raw);
        compress::encode(Method::None, &[0, 9], &mut raw);

        let mut de = Deserializer::new(&raw, true);
        de.switch_mode(Mode::Compressed);
        assert_eq!(de.read_u32().unwrap(), 1);
        assert_eq!(de.read_u8().unwrap(), 9);
        assert_eq!(de.consumed(), raw.len());
    }

    #[test]
    fn compressed_mode_disabled_is_direct() {
        let mut ser = Serializer::new(None);
        ser.switch_mode(Mode::Compressed);
        ser.write_u8(7);
        ser.switch_mode(Mode::Direct);
        assert_eq!(&ser.output()[..], &[7]);
    }

    #[test]
    fn large_payload_splits_into_frames() {
        let mut ser = Serializer::new(Some(Method::None));
        ser.switch_mode(Mode::Compressed);
        let chunk = vec![0xabu8; 64 * 1024];
        for _ in 0..20 {
            ser.write_bytes(&chunk);
        }
        ser.switch_mode(Mode::Direct);

        let out = ser.output().to_vec();
        let first = compress::FrameHeader::parse(&out).unwrap();
        assert!(first.decompressed_size as usize <= compress::MAX_FRAME_SIZE + chunk.len());
        assert!(first.frame_len() < out.len());

        let mut de = Deserializer::new(&out, true);
        de.switch_mode(Mode::Compressed);
        assert_eq!(de.read_exact(20 * chunk.len()).unwrap().len(), 20 * chunk.len());
        assert_eq!(de.consumed(), out.len());
    }
}
