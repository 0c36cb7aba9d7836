use bytes::{BufMut, BytesMut};

use super::Mode;
use crate::{
    common::verbose,
    compress::{self, MAX_FRAME_SIZE, Method},
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Buffered binary writer.
///
/// Writes are accumulated in memory, [`output_mut`][Serializer::output_mut] gives access
/// to the bytes ready to be written to the socket.
#[derive(Debug)]
pub struct Serializer {
    out: BytesMut,
    staging: BytesMut,
    mode: Mode,
    method: Option<Method>,
}

impl Serializer {
    /// Create new serializer, `method` is the compression used in [`Mode::Compressed`].
    ///
    /// With `None`, switching to [`Mode::Compressed`] have no effect.
    pub fn new(method: Option<Method>) -> Self {
        Self {
            out: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            staging: BytesMut::new(),
            mode: Mode::Direct,
            method,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch to another mode.
    ///
    /// Leaving [`Mode::Compressed`] encodes all staged bytes into frames first.
    pub fn switch_mode(&mut self, mode: Mode) {
        if self.method.is_none() || self.mode == mode {
            return;
        }
        if let Mode::Compressed = self.mode {
            self.flush_frame();
        }
        self.mode = mode;
    }

    /// Bytes ready to be written to the socket.
    pub fn output(&self) -> &BytesMut {
        &self.out
    }

    /// Bytes ready to be written to the socket.
    ///
    /// Bytes staged for compression are not included until the mode is switched back
    /// to [`Mode::Direct`].
    pub fn output_mut(&mut self) -> &mut BytesMut {
        &mut self.out
    }

    /// Encode staged bytes into frames, regardless of current mode.
    pub fn flush_frame(&mut self) {
        let Some(method) = self.method else {
            return;
        };
        while !self.staging.is_empty() {
            let len = self.staging.len().min(MAX_FRAME_SIZE);
            let chunk = self.staging.split_to(len);
            verbose!("Frame: {method} {len} bytes");
            compress::encode(method, &chunk, &mut self.out);
        }
    }

    /// Discard output after `len` and any staged bytes, returning to [`Mode::Direct`].
    pub fn truncate(&mut self, len: usize) {
        self.out.truncate(len);
        self.staging.clear();
        self.mode = Mode::Direct;
    }

    fn buf(&mut self) -> &mut BytesMut {
        match self.mode {
            Mode::Direct => &mut self.out,
            Mode::Compressed => {
                if self.staging.len() >= MAX_FRAME_SIZE {
                    self.flush_frame();
                }
                &mut self.staging
            },
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf().put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf().put_i8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf().put_u16_le(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf().put_i16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf().put_u32_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf().put_i32_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf().put_u64_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf().put_i64_le(value);
    }

    pub fn write_i128(&mut self, value: i128) {
        self.buf().put_i128_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf().put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf().put_f64_le(value);
    }

    /// Booleans are written as varint.
    pub fn write_bool(&mut self, value: bool) {
        self.write_var_uint(value as u64);
    }

    pub fn write_var_uint(&mut self, mut value: u64) {
        let buf = self.buf();
        loop {
            let mut byte = (value & 0x7f) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf.put_u8(byte);
            if value == 0 {
                return;
            }
        }
    }

    /// Signed varint, zig-zag encoded.
    pub fn write_var_int(&mut self, value: i64) {
        self.write_var_uint(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Write raw bytes without length prefix.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf().put_slice(bytes);
    }

    /// Write varint length followed by the bytes.
    pub fn write_binary(&mut self, bytes: &[u8]) {
        self.write_var_uint(bytes.len() as u64);
        self.write_bytes(bytes);
    }

    /// Write varint length followed by utf8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }
}
