//! Primitive packing/unpacking in the server's MessagePack dialect.
//!
//! Strings and blobs carried as values are prefixed with a one-byte particle
//! type inside the string body. Byte arrays reuse the string header codes.

use crate::error::DecodeError;

// Header markers
pub(crate) const NIL: u8 = 0xc0;
pub(crate) const FALSE: u8 = 0xc2;
pub(crate) const TRUE: u8 = 0xc3;
pub(crate) const FLOAT32: u8 = 0xca;
pub(crate) const FLOAT64: u8 = 0xcb;
pub(crate) const UINT8: u8 = 0xcc;
pub(crate) const UINT16: u8 = 0xcd;
pub(crate) const UINT32: u8 = 0xce;
pub(crate) const UINT64: u8 = 0xcf;
pub(crate) const INT8: u8 = 0xd0;
pub(crate) const INT16: u8 = 0xd1;
pub(crate) const INT32: u8 = 0xd2;
pub(crate) const INT64: u8 = 0xd3;
pub(crate) const STR8: u8 = 0xd9;
pub(crate) const STR16: u8 = 0xda;
pub(crate) const STR32: u8 = 0xdb;
pub(crate) const BIN8: u8 = 0xc4;
pub(crate) const BIN16: u8 = 0xc5;
pub(crate) const BIN32: u8 = 0xc6;
pub(crate) const EXT8: u8 = 0xc7;
pub(crate) const EXT16: u8 = 0xc8;
pub(crate) const EXT32: u8 = 0xc9;
pub(crate) const ARRAY16: u8 = 0xdc;
pub(crate) const ARRAY32: u8 = 0xdd;
pub(crate) const MAP16: u8 = 0xde;
pub(crate) const MAP32: u8 = 0xdf;

// =============================================================================
// ENCODING
// =============================================================================

/// Append-only packer for operation payloads.
///
/// Callers must write exactly `n` elements after `write_array_header(n)`
/// (`2n` after `write_map_header(n)`). The packer tracks open containers and
/// checks this in debug builds when the bytes are taken.
#[derive(Debug, Clone, Default)]
pub struct Packer {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl Packer {
    /// Creates a new packer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new packer with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            open: Vec::new(),
        }
    }

    /// Returns the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        debug_assert!(
            self.open.is_empty(),
            "packer finished with {} unterminated container(s)",
            self.open.len()
        );
        self.buf
    }

    /// Returns a reference to the packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Records one completed element against the innermost open container.
    fn element_done(&mut self) {
        while let Some(remaining) = self.open.last_mut() {
            *remaining -= 1;
            if *remaining > 0 {
                return;
            }
            // The finished container is itself an element of its parent.
            self.open.pop();
        }
    }

    fn open_container(&mut self, elements: usize) {
        if elements == 0 {
            self.element_done();
        } else {
            self.open.push(elements);
        }
    }

    /// Writes an array header declaring `n` following elements.
    pub fn write_array_header(&mut self, n: usize) {
        if n < 16 {
            self.buf.push(0x90 | n as u8);
        } else if n < 1 << 16 {
            self.buf.push(ARRAY16);
            self.buf.extend_from_slice(&(n as u16).to_be_bytes());
        } else {
            self.buf.push(ARRAY32);
            self.buf.extend_from_slice(&(n as u32).to_be_bytes());
        }
        self.open_container(n);
    }

    /// Writes a map header declaring `n` following key/value pairs.
    pub fn write_map_header(&mut self, n: usize) {
        if n < 16 {
            self.buf.push(0x80 | n as u8);
        } else if n < 1 << 16 {
            self.buf.push(MAP16);
            self.buf.extend_from_slice(&(n as u16).to_be_bytes());
        } else {
            self.buf.push(MAP32);
            self.buf.extend_from_slice(&(n as u32).to_be_bytes());
        }
        self.open_container(n * 2);
    }

    /// Writes a signed integer in its smallest encoding.
    pub fn write_number(&mut self, value: i64) {
        if value >= 0 {
            if value < 128 {
                self.buf.push(value as u8);
            } else if value < 1 << 8 {
                self.buf.push(UINT8);
                self.buf.push(value as u8);
            } else if value < 1 << 16 {
                self.buf.push(UINT16);
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            } else if value < 1 << 32 {
                self.buf.push(UINT32);
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            } else {
                self.buf.push(UINT64);
                self.buf.extend_from_slice(&(value as u64).to_be_bytes());
            }
        } else if value >= -32 {
            // Negative fixint: 0xe0..=0xff
            self.buf.push(value as u8);
        } else if value >= i8::MIN as i64 {
            self.buf.push(INT8);
            self.buf.push(value as i8 as u8);
        } else if value >= i16::MIN as i64 {
            self.buf.push(INT16);
            self.buf.extend_from_slice(&(value as i16).to_be_bytes());
        } else if value >= i32::MIN as i64 {
            self.buf.push(INT32);
            self.buf.extend_from_slice(&(value as i32).to_be_bytes());
        } else {
            self.buf.push(INT64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
        self.element_done();
    }

    /// Writes a big-endian f64.
    pub fn write_double(&mut self, value: f64) {
        self.buf.push(FLOAT64);
        self.buf.extend_from_slice(&value.to_be_bytes());
        self.element_done();
    }

    /// Writes a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { TRUE } else { FALSE });
        self.element_done();
    }

    /// Writes a nil marker.
    pub fn write_nil(&mut self) {
        self.buf.push(NIL);
        self.element_done();
    }

    fn write_string_header(&mut self, len: usize) {
        if len < 32 {
            self.buf.push(0xa0 | len as u8);
        } else if len < 1 << 8 {
            self.buf.push(STR8);
            self.buf.push(len as u8);
        } else if len < 1 << 16 {
            self.buf.push(STR16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(STR32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    /// Writes a UTF-8 string with no particle type (bin names, regex patterns).
    pub fn write_string(&mut self, s: &str) {
        self.write_string_header(s.len());
        self.buf.extend_from_slice(s.as_bytes());
        self.element_done();
    }

    /// Writes a string value prefixed by its particle type.
    pub fn write_particle_string(&mut self, particle_type: u8, s: &str) {
        self.write_particle_bytes(particle_type, s.as_bytes());
    }

    /// Writes a byte payload prefixed by its particle type.
    ///
    /// Byte arrays use the string header codes.
    pub fn write_particle_bytes(&mut self, particle_type: u8, bytes: &[u8]) {
        self.write_string_header(bytes.len() + 1);
        self.buf.push(particle_type);
        self.buf.extend_from_slice(bytes);
        self.element_done();
    }

    /// Writes one already-packed object verbatim (e.g. a compiled expression).
    pub fn write_packed(&mut self, packed: &[u8]) {
        self.buf.extend_from_slice(packed);
        self.element_done();
    }

    /// Writes an empty ext8 marker (`0xc7 0x00 <ext_type>`).
    pub fn write_ext_marker(&mut self, ext_type: u8) {
        self.buf.extend_from_slice(&[EXT8, 0, ext_type]);
        self.element_done();
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Unpacker over a byte slice with bounds checking.
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    /// Creates a new unpacker from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current position in the data.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of remaining bytes.
    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the bytes between `start` and the current position.
    pub fn slice_from(&self, start: usize) -> &'a [u8] {
        &self.data[start..self.pos]
    }

    /// Returns the next byte without consuming it.
    pub fn peek_byte(&self, context: &'static str) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof { context })
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        let byte = self.peek_byte(context)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads exactly n bytes.
    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining_len() {
            return Err(DecodeError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    pub(crate) fn read_u16(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    pub(crate) fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    pub(crate) fn read_u64(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array(context)?))
    }

    /// Reads an array header and returns its element count.
    pub fn read_array_header(&mut self, context: &'static str) -> Result<usize, DecodeError> {
        let marker = self.read_byte(context)?;
        match marker {
            0x90..=0x9f => Ok((marker & 0x0f) as usize),
            ARRAY16 => Ok(self.read_u16(context)? as usize),
            ARRAY32 => Ok(self.read_u32(context)? as usize),
            _ => Err(DecodeError::InvalidMarker { marker, context }),
        }
    }

    /// Reads an integer in any of its encodings.
    ///
    /// Unsigned 64-bit values above `i64::MAX` wrap, as the server does.
    pub fn read_number(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        let marker = self.read_byte(context)?;
        self.read_number_body(marker, context)
            .ok_or(DecodeError::InvalidMarker { marker, context })?
    }

    /// Decodes the body of an integer whose marker was already consumed.
    ///
    /// Returns `None` if `marker` is not an integer marker.
    pub(crate) fn read_number_body(
        &mut self,
        marker: u8,
        context: &'static str,
    ) -> Option<Result<i64, DecodeError>> {
        let result = match marker {
            0x00..=0x7f => Ok(marker as i64),
            0xe0..=0xff => Ok(marker as i8 as i64),
            UINT8 => self.read_byte(context).map(|b| b as i64),
            UINT16 => self.read_u16(context).map(|v| v as i64),
            UINT32 => self.read_u32(context).map(|v| v as i64),
            UINT64 => self.read_u64(context).map(|v| v as i64),
            INT8 => self.read_byte(context).map(|b| b as i8 as i64),
            INT16 => self.read_u16(context).map(|v| v as i16 as i64),
            INT32 => self.read_u32(context).map(|v| v as i32 as i64),
            INT64 => self.read_u64(context).map(|v| v as i64),
            _ => return None,
        };
        Some(result)
    }

    /// Skips one complete object, returning its raw bytes.
    pub fn read_raw_object(
        &mut self,
        max_depth: usize,
        context: &'static str,
    ) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        self.skip_object(0, max_depth, context)?;
        Ok(self.slice_from(start))
    }

    fn skip_object(
        &mut self,
        depth: usize,
        max_depth: usize,
        context: &'static str,
    ) -> Result<(), DecodeError> {
        if depth > max_depth {
            return Err(DecodeError::DepthExceeded { max: max_depth });
        }
        let marker = self.read_byte(context)?;
        let (skip, children) = match marker {
            0x00..=0x7f | 0xe0..=0xff | NIL | FALSE | TRUE => (0, 0),
            0x80..=0x8f => (0, (marker & 0x0f) as usize * 2),
            0x90..=0x9f => (0, (marker & 0x0f) as usize),
            0xa0..=0xbf => ((marker & 0x1f) as usize, 0),
            UINT8 | INT8 => (1, 0),
            UINT16 | INT16 => (2, 0),
            UINT32 | INT32 | FLOAT32 => (4, 0),
            UINT64 | INT64 | FLOAT64 => (8, 0),
            STR8 | BIN8 => (self.read_byte(context)? as usize, 0),
            STR16 | BIN16 => (self.read_u16(context)? as usize, 0),
            STR32 | BIN32 => (self.read_u32(context)? as usize, 0),
            ARRAY16 => (0, self.read_u16(context)? as usize),
            ARRAY32 => (0, self.read_u32(context)? as usize),
            MAP16 => (0, self.read_u16(context)? as usize * 2),
            MAP32 => (0, self.read_u32(context)? as usize * 2),
            // fixext: type byte + 1/2/4/8/16 data bytes
            0xd4 => (2, 0),
            0xd5 => (3, 0),
            0xd6 => (5, 0),
            0xd7 => (9, 0),
            0xd8 => (17, 0),
            EXT8 => (self.read_byte(context)? as usize + 1, 0),
            EXT16 => (self.read_u16(context)? as usize + 1, 0),
            EXT32 => (self.read_u32(context)? as usize + 1, 0),
            _ => return Err(DecodeError::InvalidMarker { marker, context }),
        };
        self.read_bytes(skip, context)?;
        for _ in 0..children {
            self.skip_object(depth + 1, max_depth, context)?;
        }
        Ok(())
    }
}
