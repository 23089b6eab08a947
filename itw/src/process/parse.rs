use anyhow::Result;

use crate::structs::container::ItwContainer;
use crate::utils::bitstream_io::FieldReader;

/// Parses raw ITW bytes into an [`ItwContainer`].
///
/// The container borrows the palette and both channel payloads from the
/// input, so nothing is copied until the channels are decoded.
#[derive(Default)]
pub struct Parser {
    state: ParserState,
}

impl Parser {
    /// Parses a complete container.
    ///
    /// Magic and type are checked before anything else is read; every later
    /// field is checked against the remaining input before it is read.
    pub fn parse<'a>(&self, raw: &'a [u8]) -> Result<ItwContainer<'a>> {
        let reader = &mut FieldReader::from_slice(raw);
        ItwContainer::read(&self.state, reader)
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
pub struct ParserState {
    pub fail_level: log::Level,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
        }
    }
}
