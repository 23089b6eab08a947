//! Data structures representing container components.
//!
//! Contains the fixed header and palette, the Huffman-coded channel blocks,
//! the container that ties them together, and the decode tree rebuilt from a
//! channel's leaf-weight table.

pub mod channel;
pub mod container;
pub mod header;
pub mod huffman;
