use anyhow::{Context, Result, anyhow, bail};
use log::Level::Warn;
use log::debug;

use crate::log_or_err;
use crate::process::parse::Parser;
use crate::process::reconstruct::reconstruct;
use crate::structs::channel::CompressedChannel;
use crate::structs::container::ItwContainer;
use crate::structs::huffman::HuffmanTree;
use crate::utils::bitstream_io::PayloadBitReader;
use crate::utils::errors::ChannelError;

/// Starting capacity of a channel's symbol buffer.
pub const INITIAL_OUTPUT_CAPACITY: usize = 0x4000;

/// Decodes ITW containers to grayscale pixels.
///
/// Each call is independent: trees and buffers are built for the call and
/// dropped with it.
#[derive(Default)]
pub struct Decoder {
    state: DecoderState,
}

impl Decoder {
    /// Parses and decodes a complete container.
    pub fn decode(&self, raw: &[u8]) -> Result<DecodedImage> {
        let mut parser = Parser::default();
        parser.set_fail_level(self.state.fail_level);

        let container = parser.parse(raw)?;
        self.decode_container(&container)
    }

    /// Decodes both channels of a parsed container and expands them into a
    /// `width × height` pixel grid.
    pub fn decode_container(&self, container: &ItwContainer) -> Result<DecodedImage> {
        let pixels = self.decode_compressed(&container.pixel_channel)?;
        let repeats = self.decode_compressed(&container.repeat_channel)?;

        self.reconstruct(container, &pixels, &repeats)
    }

    /// Expands channels already decoded from `container` into its pixel grid.
    pub fn reconstruct(
        &self,
        container: &ItwContainer,
        pixels: &DecodedChannel,
        repeats: &DecodedChannel,
    ) -> Result<DecodedImage> {
        reconstruct(
            &self.state,
            &pixels.symbols,
            &repeats.symbols,
            &container.palette,
            container.width(),
            container.height(),
        )
    }

    /// Rebuilds the channel's tree and walks its payload.
    ///
    /// A payload that ends inside a code is reported at warning level and the
    /// symbols decoded so far are returned.
    pub fn decode_compressed(&self, channel: &CompressedChannel) -> Result<DecodedChannel> {
        let tree = HuffmanTree::build(&channel.leaves)
            .with_context(|| format!("Building {} channel tree", channel.kind))?;

        let decoded = decode_channel(&tree, channel.payload, channel.bits_to_process)
            .with_context(|| format!("Decoding {} channel", channel.kind))?;

        debug!(
            "{} channel: {} symbols from {} bits, tree depth {}",
            channel.kind,
            decoded.symbols.len(),
            channel.bits_to_process,
            tree.max_depth()
        );

        if !decoded.ended_on_boundary {
            log_or_err!(
                self.state,
                Warn,
                anyhow!(ChannelError::UnterminatedSymbol {
                    channel: channel.kind,
                    bits: channel.bits_to_process,
                    depth: decoded.final_depth,
                })
            );
        }

        Ok(decoded)
    }

    /// Sets the failure level for validation messages.
    ///
    /// - `log::Level::Error`: Only fail on Error level messages (default)
    /// - `log::Level::Warn`: Fail on Warning level and above (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.state.fail_level = level;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecoderState {
    pub fail_level: log::Level,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
        }
    }
}

/// Symbols recovered from one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedChannel {
    /// One byte per leaf reached while consuming the payload.
    pub symbols: Vec<u8>,

    /// Whether the walk was back at the root after the last bit.
    pub ended_on_boundary: bool,

    /// Depth of the node the walk stopped on; 0 when on a boundary.
    pub final_depth: usize,
}

/// The result of decoding a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u16,
    pub height: u16,

    /// Row-major grayscale samples, exactly `width × height` of them.
    ///
    /// Pixels past the end of the grid are dropped; a grid the channels do
    /// not fill is left at zero.
    pub pixels: Vec<u8>,

    /// How many pixels the channels described, saturating at `u64::MAX`.
    pub expanded_pixels: u64,
}

/// Walks `bits_to_process` bits of `payload` through `tree`.
///
/// Bits are taken least-significant first within each byte. `0` moves to the
/// left child and `1` to the right; reaching a leaf emits its value and
/// restarts at the root, so the symbol count follows from the bit count alone.
///
/// Fails with [`ChannelError::BufferExhausted`] when `payload` is shorter than
/// `⌈bits_to_process / 8⌉` bytes.
pub fn decode_channel(
    tree: &HuffmanTree,
    payload: &[u8],
    bits_to_process: u32,
) -> Result<DecodedChannel> {
    let needed = CompressedChannel::payload_len(bits_to_process);
    if (payload.len() as u64) < needed {
        bail!(ChannelError::BufferExhausted {
            bits: bits_to_process,
            needed,
            available: payload.len() as u64,
        });
    }

    let reader = &mut PayloadBitReader::from_slice(payload);
    let root = tree.root();
    let mut node = root;
    let mut symbols = Vec::with_capacity(INITIAL_OUTPUT_CAPACITY);

    for _ in 0..bits_to_process {
        node = tree.step(node, reader.get()?);

        if let Some(value) = tree.node(node).value() {
            symbols.push(value);
            node = root;
        }
    }

    Ok(DecodedChannel {
        symbols,
        ended_on_boundary: node == root,
        final_depth: tree.depth(node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::test_support::{encode_symbols, pack_lsb, single_pixel_container};
    use crate::structs::channel::{ChannelKind, Leaf};
    use crate::utils::errors::{ErrorKind, error_kind};

    fn tree(table: &[(u32, f32)]) -> HuffmanTree {
        let leaves = table
            .iter()
            .map(|&(s, w)| Leaf::new(s, w))
            .collect::<Vec<_>>();
        HuffmanTree::build(&leaves).unwrap()
    }

    #[test]
    fn two_leaf_walk() -> Result<()> {
        let tree = tree(&[(8, 1.0), (9, 1.0)]);

        let decoded = decode_channel(&tree, &[0b0110], 4)?;
        assert_eq!(decoded.symbols, [8, 9, 9, 8]);
        assert!(decoded.ended_on_boundary);

        // Bits past bits_to_process are ignored.
        let decoded = decode_channel(&tree, &[0b1111_0110], 3)?;
        assert_eq!(decoded.symbols, [8, 9, 9]);
        Ok(())
    }

    #[test]
    fn walk_crosses_byte_boundaries() -> Result<()> {
        let tree = tree(&[(8, 1.0), (9, 1.0), (10, 2.0)]);
        // codes: 10 -> 0, 8 -> 10, 9 -> 11
        let symbols = [9, 9, 9, 10, 8, 9];
        let (bits, payload) = encode_symbols(&tree, &symbols);
        assert_eq!(bits, 11);
        assert_eq!(payload.len(), 2);

        let decoded = decode_channel(&tree, &payload, bits)?;
        assert_eq!(decoded.symbols, symbols);
        Ok(())
    }

    #[test]
    fn encoded_sequences_decode_back() -> Result<()> {
        let table = (0u32..24)
            .map(|i| (i + 8, ((i * 37) % 11 + 1) as f32 / 64.0))
            .collect::<Vec<_>>();
        let tree = tree(&table);

        let symbols = (0..5000u32)
            .map(|i| ((i * i + 3 * i) % 24 + 8) as u8)
            .collect::<Vec<_>>();
        let (bits, payload) = encode_symbols(&tree, &symbols);

        let decoded = decode_channel(&tree, &payload, bits)?;
        assert_eq!(decoded.symbols, symbols);
        assert!(decoded.ended_on_boundary);
        assert_eq!(decoded.final_depth, 0);
        Ok(())
    }

    #[test]
    fn unterminated_symbol_keeps_output() -> Result<()> {
        let tree = tree(&[(8, 1.0), (9, 1.0), (10, 2.0)]);
        // 0 | 1 -> stops inside the 8/9 subtree
        let decoded = decode_channel(&tree, &pack_lsb(&[false, true]), 2)?;

        assert_eq!(decoded.symbols, [10]);
        assert!(!decoded.ended_on_boundary);
        assert_eq!(decoded.final_depth, 1);
        Ok(())
    }

    #[test]
    fn single_leaf_emits_per_bit() -> Result<()> {
        let tree = tree(&[(3, 0.5)]);

        assert_eq!(decode_channel(&tree, &[0xA5], 3)?.symbols, [3, 3, 3]);

        let empty = decode_channel(&tree, &[], 0)?;
        assert!(empty.symbols.is_empty());
        assert!(empty.ended_on_boundary);
        Ok(())
    }

    #[test]
    fn short_payload_is_exhausted() {
        let tree = tree(&[(8, 1.0), (9, 1.0)]);
        let err = decode_channel(&tree, &[0xFF], 9).unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::BufferExhausted));
        assert_eq!(
            err.downcast_ref::<ChannelError>(),
            Some(&ChannelError::BufferExhausted {
                bits: 9,
                needed: 2,
                available: 1
            })
        );
    }

    #[test]
    fn strict_mode_rejects_unterminated_channel() -> Result<()> {
        let channel = CompressedChannel {
            kind: ChannelKind::Repeat,
            leaves: vec![Leaf::new(0, 1.0), Leaf::new(1, 1.0), Leaf::new(2, 2.0)],
            bits_to_process: 2,
            payload: &[0b10],
        };

        let decoded = Decoder::default().decode_compressed(&channel)?;
        assert_eq!(decoded.symbols, [2]);

        let mut strict = Decoder::default();
        strict.set_fail_level(log::Level::Warn);
        let err = strict.decode_compressed(&channel).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ChannelError>(),
            Some(&ChannelError::UnterminatedSymbol {
                channel: ChannelKind::Repeat,
                bits: 2,
                depth: 1
            })
        );
        Ok(())
    }

    #[test]
    fn reconstruct_from_decoded_channels() -> Result<()> {
        let container = Parser::default().parse(crate::process::EXAMPLE_DATA)?;
        let decoder = Decoder::default();

        let pixels = decoder.decode_compressed(&container.pixel_channel)?;
        let repeats = decoder.decode_compressed(&container.repeat_channel)?;
        assert_eq!(pixels.symbols, [8, 11, 10]);
        assert_eq!(repeats.symbols, [1]);

        let image = decoder.reconstruct(&container, &pixels, &repeats)?;
        assert_eq!(image, decoder.decode_container(&container)?);
        assert_eq!(image.pixels, [0x80, 0x80, 0x20, 0x80]);
        Ok(())
    }

    #[test]
    fn run_of_four() -> Result<()> {
        let container = single_pixel_container(4, 1, &[0x80], &[8], &[2]);
        let image = Decoder::default().decode(&container.to_bytes())?;

        assert_eq!(image.width, 4);
        assert_eq!(image.height, 1);
        assert_eq!(image.pixels, [0x80; 4]);
        assert_eq!(image.expanded_pixels, 4);
        Ok(())
    }

    #[test]
    fn mixed_runs_and_singles() -> Result<()> {
        // palette of 2: run markers 8..=9, single-pixel markers 10..=11
        let container =
            single_pixel_container(4, 2, &[0x10, 0xF0], &[9, 10, 8, 11, 11], &[1, 2]);
        let image = Decoder::default().decode(&container.to_bytes())?;

        assert_eq!(
            image.pixels,
            [0xF0, 0xF0, 0x10, 0x10, 0x10, 0x10, 0x10, 0xF0]
        );
        assert_eq!(image.expanded_pixels, 9);
        Ok(())
    }

    #[test]
    fn channels_must_agree() {
        let container = single_pixel_container(8, 1, &[0x80], &[8, 8], &[2]);
        let err = Decoder::default()
            .decode(&container.to_bytes())
            .unwrap_err();

        assert_eq!(error_kind(&err), Some(ErrorKind::IntegrityMismatch));
    }

    #[test]
    fn pixel_shortfall_is_a_warning() -> Result<()> {
        let container = single_pixel_container(2, 1, &[0x80], &[9], &[]);
        let bytes = container.to_bytes();

        let image = Decoder::default().decode(&bytes)?;
        assert_eq!(image.pixels, [0x80, 0x00]);
        assert_eq!(image.expanded_pixels, 1);

        let mut strict = Decoder::default();
        strict.set_fail_level(log::Level::Warn);
        assert!(strict.decode(&bytes).is_err());
        Ok(())
    }
}
