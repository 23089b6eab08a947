//! Bit and byte readers for container parsing.
//!
//! [`FieldReader`] reads the fixed-width header and channel fields and checks
//! every read against the remaining input first, so a short buffer becomes a
//! [`ContainerError::Truncated`] instead of an I/O error mid-field.
//! [`PayloadBitReader`] walks a Huffman payload one bit at a time,
//! least-significant bit first within each byte.

use std::io;
use std::io::SeekFrom;

use anyhow::{Result, bail};
use bitstream_io::{BigEndian, BitRead, BitReader, LittleEndian};

use crate::utils::errors::ContainerError;

#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    bs: BitReader<io::Cursor<&'a [u8]>, BigEndian>,
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self {
            data,
            bs: BitReader::new(io::Cursor::new(data)),
            pos: 0,
        }
    }

    /// Byte offset of the next field.
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fails with [`ContainerError::Truncated`] unless `needed` more bytes
    /// are present.
    #[inline(always)]
    pub fn ensure(&self, field: &'static str, needed: u64) -> Result<()> {
        let available = self.available() as u64;
        if needed > available {
            bail!(ContainerError::Truncated {
                field,
                needed,
                available,
            });
        }
        Ok(())
    }

    #[inline(always)]
    pub fn get_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        let value = self.bs.read_unsigned_var::<u8>(8)?;
        self.pos += 1;
        Ok(value)
    }

    #[inline(always)]
    pub fn get_be_u16(&mut self, field: &'static str) -> Result<u16> {
        self.ensure(field, 2)?;
        let value = self.bs.read_unsigned_var::<u16>(16)?;
        self.pos += 2;
        Ok(value)
    }

    #[inline(always)]
    pub fn get_be_u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(field, 4)?;
        let value = self.bs.read_unsigned_var::<u32>(32)?;
        self.pos += 4;
        Ok(value)
    }

    /// Reads a little-endian 32-bit field from the big-endian stream.
    #[inline(always)]
    pub fn get_le_u32(&mut self, field: &'static str) -> Result<u32> {
        self.get_be_u32(field).map(u32::swap_bytes)
    }

    /// Borrows the next `len` bytes and moves past them.
    pub fn get_bytes(&mut self, field: &'static str, len: u64) -> Result<&'a [u8]> {
        self.ensure(field, len)?;
        let len = len as usize;
        let bytes = &self.data[self.pos..self.pos + len];
        self.bs.seek_bits(SeekFrom::Current(len as i64 * 8))?;
        self.pos += len;
        Ok(bytes)
    }
}

/// Reads a Huffman payload bit by bit, LSB first.
#[derive(Debug)]
pub struct PayloadBitReader<'a> {
    bs: BitReader<io::Cursor<&'a [u8]>, LittleEndian>,
}

impl<'a> PayloadBitReader<'a> {
    pub fn from_slice(payload: &'a [u8]) -> Self {
        Self {
            bs: BitReader::new(io::Cursor::new(payload)),
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }
}
