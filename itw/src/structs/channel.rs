//! Huffman-coded channel blocks.
//!
//! Every field inside a channel block is little-endian:
//!
//! | Field | Size |
//! |---|---|
//! | leaf count | 4 bytes |
//! | leaves | leaf count × (symbol: 4 bytes, weight: 4 bytes IEEE-754) |
//! | bits to process | 4 bytes |
//! | payload | ⌈bits to process / 8⌉ bytes |

use std::fmt::Display;

use anyhow::{Result, anyhow, bail};
use itwd_macros::ToBytes;
use log::Level::Info;
use log::{debug, trace};

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::utils::bitstream_io::FieldReader;
use crate::utils::byteorder::WriteBytesLe;
use crate::utils::errors::ChannelError;

/// Size of one transmitted (symbol, weight) pair.
pub const LEAF_RECORD_LEN: u64 = 8;

/// One entry of a transmitted leaf-weight table.
#[derive(Debug, Clone, Copy, PartialEq, ToBytes)]
pub struct Leaf {
    /// Symbol as transmitted. Only the low byte is decoded.
    pub symbol: u32,
    pub weight: f32,
}

impl Leaf {
    pub fn new(symbol: u32, weight: f32) -> Self {
        Self { symbol, weight }
    }

    #[inline(always)]
    pub fn value(&self) -> u8 {
        self.symbol as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Palette-index symbols, run or single-pixel markers.
    Pixel,
    /// Run-length exponents, one per run marker.
    Repeat,
}

impl ChannelKind {
    pub(crate) fn size_field(self) -> &'static str {
        match self {
            ChannelKind::Pixel => "pixel channel size",
            ChannelKind::Repeat => "repeat channel size",
        }
    }

    pub(crate) fn block_field(self) -> &'static str {
        match self {
            ChannelKind::Pixel => "pixel channel data",
            ChannelKind::Repeat => "repeat channel data",
        }
    }
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Pixel => write!(f, "pixel"),
            ChannelKind::Repeat => write!(f, "repeat"),
        }
    }
}

/// A channel as stored in the container: the leaf-weight table needed to
/// rebuild its tree and the packed bits to walk it with.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedChannel<'a> {
    pub kind: ChannelKind,
    pub leaves: Vec<Leaf>,
    pub bits_to_process: u32,
    /// Exactly [`payload_len`](Self::payload_len) bytes.
    pub payload: &'a [u8],
}

impl<'a> CompressedChannel<'a> {
    /// Bytes needed to hold `bits` payload bits.
    #[inline(always)]
    pub fn payload_len(bits: u32) -> u64 {
        (u64::from(bits) + 7) >> 3
    }

    /// Parses one channel block. `block` is the exact byte range declared by
    /// the container's channel size field.
    pub fn read(state: &ParserState, kind: ChannelKind, block: &'a [u8]) -> Result<Self> {
        let reader = &mut FieldReader::from_slice(block);

        let leaf_count = reader.get_le_u32("leaf count")?;
        if leaf_count == 0 {
            bail!(ChannelError::ZeroLeafCount);
        }

        // Check the whole table up front so a bogus count never allocates.
        reader.ensure("leaf table", u64::from(leaf_count) * LEAF_RECORD_LEN)?;

        let mut leaves = Vec::with_capacity(leaf_count as usize);
        for _ in 0..leaf_count {
            let symbol = reader.get_le_u32("leaf symbol")?;
            let weight = f32::from_bits(reader.get_le_u32("leaf weight")?);

            if symbol > 0xFF {
                debug!(
                    "{kind} channel: symbol {symbol:#X} truncated to {:#04X}",
                    symbol as u8
                );
            }

            leaves.push(Leaf { symbol, weight });
        }

        let bits_to_process = reader.get_le_u32("bits to process")?;
        let payload = reader.get_bytes("payload", Self::payload_len(bits_to_process))?;

        trace!(
            "{kind} channel: {leaf_count} leaves, {bits_to_process} bits in {} bytes",
            payload.len()
        );

        if reader.available() > 0 {
            log_or_err!(
                state,
                Info,
                anyhow!(ChannelError::TrailingData(reader.available()))
            );
        }

        Ok(Self {
            kind,
            leaves,
            bits_to_process,
            payload,
        })
    }

    /// Serializes the channel block, without the container's size prefix.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut block = Vec::with_capacity(
            12 + self.leaves.len() * LEAF_RECORD_LEN as usize + self.payload.len(),
        );

        (self.leaves.len() as u32).write_le(&mut block);
        self.leaves.write_le(&mut block);
        self.bits_to_process.write_le(&mut block);
        block.extend_from_slice(self.payload);

        block
    }
}
