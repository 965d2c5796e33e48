//! NDR encoding/decoding context
//!
//! The context carries the byte order negotiated by the transfer syntax and
//! provides aligned, bounds-checked primitive access. Every helper takes the
//! running stream `position` so alignment is computed relative to the start
//! of the stub data, not the start of the current buffer slice.

use crate::{NdrError, Result};
use bytes::{Buf, BufMut, Bytes};

/// NDR encoding/decoding context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdrContext {
    /// Whether to use little-endian byte order
    pub little_endian: bool,
}

impl NdrContext {
    /// Create a new NDR context with little-endian byte order (default)
    pub fn new() -> Self {
        Self { little_endian: true }
    }

    /// Create a context with big-endian byte order
    pub fn big_endian() -> Self {
        Self { little_endian: false }
    }

    /// Create a context with specified byte order
    pub fn with_byte_order(little_endian: bool) -> Self {
        Self { little_endian }
    }

    /// Calculate padding needed to align to the given boundary
    #[inline]
    pub fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment <= 1 {
            return 0;
        }
        let remainder = position % alignment;
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    /// Write zero padding up to the given boundary
    pub fn write_align<B: BufMut>(&self, buf: &mut B, position: &mut usize, alignment: usize) {
        let padding = Self::align_padding(*position, alignment);
        buf.put_bytes(0, padding);
        *position += padding;
    }

    /// Skip padding up to the given boundary
    pub fn read_align<B: Buf>(&self, buf: &mut B, position: &mut usize, alignment: usize) -> Result<()> {
        let padding = Self::align_padding(*position, alignment);
        Self::ensure(buf, padding)?;
        buf.advance(padding);
        *position += padding;
        Ok(())
    }

    #[inline]
    fn ensure<B: Buf>(buf: &B, needed: usize) -> Result<()> {
        if buf.remaining() < needed {
            return Err(NdrError::BufferUnderflow {
                needed,
                have: buf.remaining(),
            });
        }
        Ok(())
    }

    /// Aligns, then checks that `size` bytes are available.
    fn prepare_read<B: Buf>(&self, buf: &mut B, position: &mut usize, size: usize) -> Result<()> {
        let padding = Self::align_padding(*position, size);
        Self::ensure(buf, padding + size)?;
        buf.advance(padding);
        *position += padding + size;
        Ok(())
    }

    // Encoding

    /// Write a u8
    pub fn write_u8<B: BufMut>(&self, buf: &mut B, position: &mut usize, value: u8) {
        buf.put_u8(value);
        *position += 1;
    }

    /// Write a 2-aligned u16
    pub fn write_u16<B: BufMut>(&self, buf: &mut B, position: &mut usize, value: u16) {
        self.write_align(buf, position, 2);
        if self.little_endian {
            buf.put_u16_le(value);
        } else {
            buf.put_u16(value);
        }
        *position += 2;
    }

    /// Write a 4-aligned u32
    pub fn write_u32<B: BufMut>(&self, buf: &mut B, position: &mut usize, value: u32) {
        self.write_align(buf, position, 4);
        if self.little_endian {
            buf.put_u32_le(value);
        } else {
            buf.put_u32(value);
        }
        *position += 4;
    }

    /// Write a 4-aligned i32
    pub fn write_i32<B: BufMut>(&self, buf: &mut B, position: &mut usize, value: i32) {
        self.write_u32(buf, position, value as u32);
    }

    /// Write an 8-aligned u64
    pub fn write_u64<B: BufMut>(&self, buf: &mut B, position: &mut usize, value: u64) {
        self.write_align(buf, position, 8);
        if self.little_endian {
            buf.put_u64_le(value);
        } else {
            buf.put_u64(value);
        }
        *position += 8;
    }

    /// Write raw octets (no alignment, no byte swapping)
    pub fn write_bytes<B: BufMut>(&self, buf: &mut B, position: &mut usize, bytes: &[u8]) {
        buf.put_slice(bytes);
        *position += bytes.len();
    }

    // Decoding

    /// Read a u8
    pub fn read_u8<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<u8> {
        self.prepare_read(buf, position, 1)?;
        Ok(buf.get_u8())
    }

    /// Read a 2-aligned u16
    pub fn read_u16<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<u16> {
        self.prepare_read(buf, position, 2)?;
        Ok(if self.little_endian {
            buf.get_u16_le()
        } else {
            buf.get_u16()
        })
    }

    /// Read a 4-aligned u32
    pub fn read_u32<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<u32> {
        self.prepare_read(buf, position, 4)?;
        Ok(if self.little_endian {
            buf.get_u32_le()
        } else {
            buf.get_u32()
        })
    }

    /// Read a 4-aligned i32
    pub fn read_i32<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<i32> {
        self.read_u32(buf, position).map(|v| v as i32)
    }

    /// Read an 8-aligned u64
    pub fn read_u64<B: Buf>(&self, buf: &mut B, position: &mut usize) -> Result<u64> {
        self.prepare_read(buf, position, 8)?;
        Ok(if self.little_endian {
            buf.get_u64_le()
        } else {
            buf.get_u64()
        })
    }

    /// Read `len` raw octets
    pub fn read_bytes<B: Buf>(&self, buf: &mut B, position: &mut usize, len: usize) -> Result<Bytes> {
        Self::ensure(buf, len)?;
        *position += len;
        Ok(buf.copy_to_bytes(len))
    }

    /// Read a fixed number of raw octets into an array
    pub fn read_array<B: Buf, const N: usize>(&self, buf: &mut B, position: &mut usize) -> Result<[u8; N]> {
        Self::ensure(buf, N)?;
        let mut out = [0u8; N];
        buf.copy_to_slice(&mut out);
        *position += N;
        Ok(out)
    }

    /// Skip `len` octets
    pub fn skip<B: Buf>(&self, buf: &mut B, position: &mut usize, len: usize) -> Result<()> {
        Self::ensure(buf, len)?;
        buf.advance(len);
        *position += len;
        Ok(())
    }
}

impl Default for NdrContext {
    fn default() -> Self {
        Self::new()
    }
}
