//! Utility functions and supporting infrastructure.
//!
//! Provides bounds-checked field and payload readers, fixed-layout byte
//! serialization, and error handling.

pub mod bitstream_io;
pub mod byteorder;
pub mod errors;
