//! Decoder for ITW grayscale image containers.
//!
//! ## Technical Overview
//!
//! An ITW container holds a small fixed header, a grayscale palette and two
//! independently Huffman-coded channels.
//!
//! ### Channels
//!
//! Each channel carries only its leaf-weight table, from which the decode tree
//! is rebuilt, followed by a bit count and the packed payload (least-significant
//! bit first).
//!
//! - **Pixel channel**: run markers and single-pixel markers, both indexing the
//!   palette
//! - **Repeat channel**: one power-of-two exponent per run marker
//!
//! ### Reconstruction
//!
//! Run markers expand to `2^r` copies of their palette entry, single-pixel
//! markers to one. The number of run markers must equal the number of repeat
//! values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use itw::process::{decode::Decoder, parse::Parser, EXAMPLE_DATA};
//!
//! // One call for the common case
//! let image = itw::decode_container(EXAMPLE_DATA)?;
//! assert_eq!(image.pixels.len(), usize::from(image.width) * usize::from(image.height));
//!
//! // Or parse first to inspect the container, then decode strictly
//! let container = Parser::default().parse(EXAMPLE_DATA)?;
//! println!("{} palette entries", container.palette.len());
//!
//! let mut decoder = Decoder::default();
//! decoder.set_fail_level(log::Level::Warn);
//! let image = decoder.decode_container(&container)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Processing functionality for ITW containers.
///
/// 1. **Parsing** ([`process::parse`]): Converts raw bytes into a borrowed
///    container structure.
///
/// 2. **Decoding** ([`process::decode`]): Rebuilds the Huffman trees and walks
///    both channel payloads.
///
/// 3. **Reconstruction** ([`process::reconstruct`]): Expands runs and palette
///    lookups into the pixel grid.
pub mod process;

/// Data structures representing ITW format components.
///
/// - **Header and palette** ([`structs::header`])
/// - **Channel blocks** ([`structs::channel`])
/// - **Container** ([`structs::container`])
/// - **Huffman trees** ([`structs::huffman`])
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bounds-checked field reads
///   and payload bit reads
/// - **Byte order** ([`utils::byteorder`]): Fixed-layout serialization
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;

pub use process::decode_container;
