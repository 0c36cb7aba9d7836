use super::{DecodeError, MAX_BINARY_LEN, MAX_VARINT_LEN, Mode};
use crate::compress;

/// Upper bound of capacity reserved from a length read off the wire.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// Binary reader over a snapshot of received bytes.
///
/// Reading past the end of the snapshot returns [`DecodeError::Incomplete`] with the
/// raw length required, so caller can read more from the socket and decode again
/// from the start.
#[derive(Debug)]
pub struct Deserializer<'a> {
    raw: &'a [u8],
    pos: usize,
    mode: Mode,
    compression: bool,
    frame: Vec<u8>,
    frame_pos: usize,
}

macro_rules! read_le {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty, DecodeError> {
                let mut b = [0u8; size_of::<$ty>()];
                self.read_into(&mut b)?;
                Ok(<$ty>::from_le_bytes(b))
            }
        )*
    };
}

impl<'a> Deserializer<'a> {
    /// Create new deserializer, `compression` tells whether [`Mode::Compressed`] reads frames.
    pub fn new(raw: &'a [u8], compression: bool) -> Self {
        Self {
            raw,
            pos: 0,
            mode: Mode::Direct,
            compression,
            frame: Vec::new(),
            frame_pos: 0,
        }
    }

    /// Raw bytes consumed, including whole frames decoded.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch to another mode.
    ///
    /// Leaving [`Mode::Compressed`] discards the rest of the current frame.
    pub fn switch_mode(&mut self, mode: Mode) {
        if !self.compression || self.mode == mode {
            return;
        }
        if self.frame_pos != self.frame.len() {
            #[cfg(feature = "log")]
            log::warn!("discarding {} trailing bytes of compressed frame", self.frame.len() - self.frame_pos);
        }
        self.frame.clear();
        self.frame_pos = 0;
        self.mode = mode;
    }

    fn next_frame(&mut self) -> Result<(), DecodeError> {
        let (frame, len) = compress::decode(&self.raw[self.pos..]).map_err(|err| match err {
            DecodeError::Incomplete { expect } => DecodeError::Incomplete { expect: self.pos.saturating_add(expect) },
            err => err,
        })?;
        self.pos += len;
        self.frame = frame;
        self.frame_pos = 0;
        Ok(())
    }

    /// Fill `dst` entirely.
    pub fn read_into(&mut self, dst: &mut [u8]) -> Result<(), DecodeError> {
        match self.mode {
            Mode::Direct => {
                let end = self.end(dst.len())?;
                let Some(src) = self.raw.get(self.pos..end) else {
                    return Err(DecodeError::Incomplete { expect: end });
                };
                dst.copy_from_slice(src);
                self.pos = end;
            },
            Mode::Compressed => {
                let mut filled = 0;
                while filled < dst.len() {
                    if self.frame_pos == self.frame.len() {
                        self.next_frame()?;
                        continue;
                    }
                    let n = (dst.len() - filled).min(self.frame.len() - self.frame_pos);
                    dst[filled..filled + n].copy_from_slice(&self.frame[self.frame_pos..self.frame_pos + n]);
                    filled += n;
                    self.frame_pos += n;
                }
            },
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(b[0])
    }

    read_le! {
        read_i8 -> i8,
        read_u16 -> u16,
        read_i16 -> i16,
        read_u32 -> u32,
        read_i32 -> i32,
        read_u64 -> u64,
        read_i64 -> i64,
        read_i128 -> i128,
        read_f32 -> f32,
        read_f64 -> f64,
    }

    /// Booleans are read as varint.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_var_uint()? != 0)
    }

    pub fn read_var_uint(&mut self) -> Result<u64, DecodeError> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            value |= ((byte & 0x7f) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    /// Signed varint, zig-zag encoded.
    pub fn read_var_int(&mut self) -> Result<i64, DecodeError> {
        let value = self.read_var_uint()?;
        Ok(((value >> 1) as i64) ^ -((value & 1) as i64))
    }

    fn end(&self, len: usize) -> Result<usize, DecodeError> {
        self.pos.checked_add(len).ok_or_else(|| DecodeError::invalid("length overflow"))
    }

    /// Read exactly `len` raw bytes.
    ///
    /// Lengths above [`MAX_BINARY_LEN`] are rejected.
    pub fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        if len > MAX_BINARY_LEN {
            return Err(DecodeError::invalid(format!("binary length {len} exceeds {MAX_BINARY_LEN}")));
        }
        match self.mode {
            Mode::Direct => {
                let end = self.end(len)?;
                let Some(src) = self.raw.get(self.pos..end) else {
                    return Err(DecodeError::Incomplete { expect: end });
                };
                self.pos = end;
                Ok(src.to_vec())
            },
            Mode::Compressed => {
                // capacity follows the decoded frames
                let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                while buf.len() < len {
                    if self.frame_pos == self.frame.len() {
                        self.next_frame()?;
                        continue;
                    }
                    let n = (len - buf.len()).min(self.frame.len() - self.frame_pos);
                    buf.extend_from_slice(&self.frame[self.frame_pos..self.frame_pos + n]);
                    self.frame_pos += n;
                }
                Ok(buf)
            },
        }
    }

    /// Read varint length followed by the bytes.
    pub fn read_binary(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_var_uint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::invalid("string length overflow"))?;
        self.read_exact(len)
    }

    /// Read varint length followed by utf8 bytes.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_binary()?;
        String::from_utf8(bytes).map_err(|err| DecodeError::Utf8(err.utf8_error()))
    }
}
