use anyhow::Result;

/// Container parsing.
///
/// Provides the [`Parser`](parse::Parser) for turning raw bytes into an
/// [`ItwContainer`](crate::structs::container::ItwContainer) that borrows its
/// palette and channel payloads from the input.
pub mod parse;

/// Channel decoding.
///
/// Provides the [`Decoder`](decode::Decoder), which rebuilds each channel's
/// Huffman tree, walks its payload, and hands both symbol streams to the
/// reconstructor.
pub mod decode;

/// Palette lookup and run expansion into a pixel grid.
pub mod reconstruct;

use crate::process::decode::{DecodedImage, Decoder};

/// A 4×1 container: a run of two `0x80` pixels, then `0x20`, then `0x80`.
pub const EXAMPLE_DATA: &[u8] = &[
    0x49, 0x54, 0x57, 0x5F, 0x00, 0x00, 0x00, 0x04, 0x00, 0x01, 0x00, 0x00, 0x04, 0x00, 0x02, 0x80,
    0x20, 0x00, 0x00, 0x00, 0x21, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80,
    0x3F, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3F, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x40, 0x05, 0x00, 0x00, 0x00, 0x19, 0x00, 0x00, 0x00, 0x11, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x80, 0x3F, 0x01, 0x00, 0x00, 0x00, 0x00,
];

/// Decodes a complete container with the default, permissive fail level.
///
/// Mid-symbol channel endings and a pixel count that does not match the grid
/// are logged as warnings; use [`Decoder::set_fail_level`] to reject them.
pub fn decode_container(raw: &[u8]) -> Result<DecodedImage> {
    Decoder::default().decode(raw)
}


#[test]
fn test_example_data() -> Result<()> {
    let image = decode_container(EXAMPLE_DATA)?;
    assert_eq!((image.width, image.height), (4, 1));
    assert_eq!(image.pixels, [0x80, 0x80, 0x20, 0x80]);
    assert_eq!(image.expanded_pixels, 4);
    Ok(())
}
