//! Fixed container header and palette.
//!
//! All header fields are big-endian. The two reserved words are carried
//! through so a parsed container serializes back unchanged.

use anyhow::{Result, bail};
use itwd_macros::ToBytes;

use crate::utils::bitstream_io::FieldReader;
use crate::utils::errors::ContainerError;

/// `"ITW_"` read as a big-endian word.
pub const ITW_MAGIC: u32 = 0x49_54_57_5F;

/// The only container type this decoder understands: Huffman-coded
/// palette indices with a separate repeat channel.
pub const ITW_TYPE_HUFFMAN_RLE: u16 = 0x0400;

/// Header size in bytes, up to and excluding the palette count.
pub const ITW_HEADER_LEN: usize = 14;

/// Pixel symbols below this value never map to a palette entry.
pub const PALETTE_SYMBOL_BASE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToBytes)]
pub struct ItwHeader {
    pub magic: u32,
    pub reserved_1: u16,
    pub width: u16,
    pub height: u16,
    pub reserved_2: u16,
    pub format_type: u16,
}

impl ItwHeader {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            magic: ITW_MAGIC,
            reserved_1: 0,
            width,
            height,
            reserved_2: 0,
            format_type: ITW_TYPE_HUFFMAN_RLE,
        }
    }

    pub fn read(reader: &mut FieldReader) -> Result<Self> {
        let magic = reader.get_be_u32("magic")?;
        if magic != ITW_MAGIC {
            bail!(ContainerError::InvalidMagic {
                expected: ITW_MAGIC,
                read: magic,
            });
        }

        let header = Self {
            magic,
            reserved_1: reader.get_be_u16("reserved")?,
            width: reader.get_be_u16("width")?,
            height: reader.get_be_u16("height")?,
            reserved_2: reader.get_be_u16("reserved")?,
            format_type: reader.get_be_u16("type")?,
        };

        if header.format_type != ITW_TYPE_HUFFMAN_RLE {
            bail!(ContainerError::UnsupportedType {
                expected: ITW_TYPE_HUFFMAN_RLE,
                read: header.format_type,
            });
        }

        Ok(header)
    }

    /// Number of pixels in the grid.
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// Grayscale palette, indexed from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Palette<'a> {
    entries: &'a [u8],
}

impl<'a> Palette<'a> {
    pub const fn new(entries: &'a [u8]) -> Self {
        Self { entries }
    }

    pub fn read(reader: &mut FieldReader<'a>) -> Result<Self> {
        let count = reader.get_u8("palette count")?;
        let entries = reader.get_bytes("palette", u64::from(count))?;
        Ok(Self { entries })
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &'a [u8] {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First pixel symbol that is a single-pixel marker rather than a run
    /// marker.
    #[inline(always)]
    pub fn single_pixel_base(&self) -> usize {
        usize::from(PALETTE_SYMBOL_BASE) + self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join_bytes_be;
    use crate::utils::byteorder::WriteBytesBe;
    use crate::utils::errors::{ErrorKind, error_kind};

    #[test]
    fn header_layout() -> Result<()> {
        let header = ItwHeader::new(640, 480);
        let mut bytes = Vec::new();
        header.write_be(&mut bytes);

        assert_eq!(bytes.len(), ITW_HEADER_LEN);
        assert_eq!(
            bytes,
            [0x49, 0x54, 0x57, 0x5F, 0, 0, 0x02, 0x80, 0x01, 0xE0, 0, 0, 0x04, 0x00]
        );

        let parsed = ItwHeader::read(&mut FieldReader::from_slice(&bytes))?;
        assert_eq!(parsed, header);
        assert_eq!(parsed.pixel_count(), 640 * 480);
        Ok(())
    }

    #[test]
    fn bad_magic_and_type() {
        let bytes = join_bytes_be!(0x4954_5700u32, 0u16, 1u16, 1u16, 0u16, 0x0400u16);
        let err = ItwHeader::read(&mut FieldReader::from_slice(&bytes)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ContainerError>(),
            Some(&ContainerError::InvalidMagic {
                expected: ITW_MAGIC,
                read: 0x4954_5700
            })
        );

        let bytes = join_bytes_be!(ITW_MAGIC, 0u16, 1u16, 1u16, 0u16, 0x0300u16);
        let err = ItwHeader::read(&mut FieldReader::from_slice(&bytes)).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::MalformedInput));
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::UnsupportedType { read: 0x0300, .. })
        ));
    }

    #[test]
    fn palette_read() -> Result<()> {
        let bytes = [3, 0x00, 0x80, 0xFF, 0x42];
        let reader = &mut FieldReader::from_slice(&bytes);
        let palette = Palette::read(reader)?;

        assert_eq!(palette.entries(), &[0x00, 0x80, 0xFF]);
        assert_eq!(palette.get(1), Some(0x80));
        assert_eq!(palette.get(3), None);
        assert_eq!(palette.single_pixel_base(), 11);
        assert_eq!(reader.remaining(), &[0x42]);

        let short = [4, 0x00, 0x80];
        assert!(Palette::read(&mut FieldReader::from_slice(&short)).is_err());
        Ok(())
    }
}
