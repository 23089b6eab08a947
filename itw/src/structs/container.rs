//! Whole ITW container.
//!
//! | Offset | Field | Size |
//! |---|---|---|
//! | 0 | header ([`ItwHeader`]) | 14 bytes |
//! | 14 | palette count | 1 byte |
//! | 15 | palette | N bytes |
//! | 15+N | pixel channel size | 4 bytes BE |
//! | … | pixel channel block | size bytes |
//! | … | repeat channel size | 4 bytes BE |
//! | … | repeat channel block | size bytes |

use anyhow::{Context, Result, anyhow};
use log::Level::Info;
use log::debug;

use crate::log_or_err;
use crate::process::parse::ParserState;
use crate::structs::channel::{ChannelKind, CompressedChannel};
use crate::structs::header::{ItwHeader, Palette};
use crate::utils::bitstream_io::FieldReader;
use crate::utils::byteorder::WriteBytesBe;
use crate::utils::errors::ContainerError;

#[derive(Debug, Clone, PartialEq)]
pub struct ItwContainer<'a> {
    pub header: ItwHeader,
    pub palette: Palette<'a>,
    pub pixel_channel: CompressedChannel<'a>,
    pub repeat_channel: CompressedChannel<'a>,
}

impl<'a> ItwContainer<'a> {
    pub fn read(state: &ParserState, reader: &mut FieldReader<'a>) -> Result<Self> {
        let header = ItwHeader::read(reader)?;
        let palette = Palette::read(reader)?;

        debug!(
            "ITW container: {}x{}, {} palette entries",
            header.width,
            header.height,
            palette.len()
        );

        let pixel_channel = Self::read_channel(state, reader, ChannelKind::Pixel)?;
        let repeat_channel = Self::read_channel(state, reader, ChannelKind::Repeat)?;

        if reader.available() > 0 {
            log_or_err!(
                state,
                Info,
                anyhow!(ContainerError::TrailingData(reader.available()))
            );
        }

        Ok(Self {
            header,
            palette,
            pixel_channel,
            repeat_channel,
        })
    }

    fn read_channel(
        state: &ParserState,
        reader: &mut FieldReader<'a>,
        kind: ChannelKind,
    ) -> Result<CompressedChannel<'a>> {
        let size = reader.get_be_u32(kind.size_field())?;
        let block = reader.get_bytes(kind.block_field(), u64::from(size))?;

        debug!(
            "{kind} channel block: {size} bytes at offset {}",
            reader.position() - block.len()
        );

        CompressedChannel::read(state, kind, block)
            .with_context(|| format!("Reading {kind} channel"))
    }

    pub fn width(&self) -> u16 {
        self.header.width
    }

    pub fn height(&self) -> u16 {
        self.header.height
    }

    /// Serializes the container in its on-disk layout. Trailing data that
    /// was skipped while parsing is not reproduced.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        self.header.write_be(&mut bytes);
        (self.palette.len() as u8).write_be(&mut bytes);
        bytes.extend_from_slice(self.palette.entries());

        for channel in [&self.pixel_channel, &self.repeat_channel] {
            let block = channel.to_bytes();
            (block.len() as u32).write_be(&mut bytes);
            bytes.extend_from_slice(&block);
        }

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::channel::Leaf;
    use crate::utils::errors::{ErrorKind, error_kind};

    fn sample() -> ItwContainer<'static> {
        ItwContainer {
            header: ItwHeader::new(4, 1),
            palette: Palette::new(&[0x80, 0x20]),
            pixel_channel: CompressedChannel {
                kind: ChannelKind::Pixel,
                leaves: vec![Leaf::new(8, 1.0), Leaf::new(11, 1.0)],
                bits_to_process: 2,
                payload: &[0b10],
            },
            repeat_channel: CompressedChannel {
                kind: ChannelKind::Repeat,
                leaves: vec![Leaf::new(1, 1.0)],
                bits_to_process: 1,
                payload: &[0x00],
            },
        }
    }

    #[test]
    fn serialize_and_read_back() -> Result<()> {
        let container = sample();
        let bytes = container.to_bytes();

        // header, palette, two size-prefixed blocks of 25 and 17 bytes
        assert_eq!(bytes.len(), 14 + 3 + 4 + 25 + 4 + 17);

        let parsed =
            ItwContainer::read(&ParserState::default(), &mut FieldReader::from_slice(&bytes))?;
        assert_eq!(parsed, container);
        Ok(())
    }

    #[test]
    fn every_truncation_is_malformed() {
        let bytes = sample().to_bytes();

        for len in 0..bytes.len() {
            let err = ItwContainer::read(
                &ParserState::default(),
                &mut FieldReader::from_slice(&bytes[..len]),
            )
            .unwrap_err();
            assert_eq!(error_kind(&err), Some(ErrorKind::MalformedInput), "{len}");
        }
    }

    #[test]
    fn channel_errors_name_the_channel() {
        let mut container = sample();
        container.repeat_channel.payload = &[];
        let mut bytes = container.to_bytes();
        // Declare 9 bits but ship no payload bytes.
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&9u32.to_le_bytes());

        let err = ItwContainer::read(
            &ParserState::default(),
            &mut FieldReader::from_slice(&bytes),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Reading repeat channel");
        assert!(matches!(
            err.downcast_ref::<ContainerError>(),
            Some(ContainerError::Truncated {
                field: "payload",
                needed: 2,
                available: 0
            })
        ));
    }

    #[test]
    fn trailing_data_is_informational() -> Result<()> {
        let mut bytes = sample().to_bytes();
        bytes.extend_from_slice(&[0, 0, 0]);

        let parsed =
            ItwContainer::read(&ParserState::default(), &mut FieldReader::from_slice(&bytes))?;
        assert_eq!(parsed, sample());
        assert_eq!(parsed.to_bytes().len(), bytes.len() - 3);
        Ok(())
    }
}
