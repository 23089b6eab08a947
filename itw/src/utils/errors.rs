use std::fmt::Display;

use crate::structs::channel::ChannelKind;

#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

/// Broad classification of every failure the decoder can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad magic or type, truncated header or channel, unusable leaf table,
    /// or symbols that do not map onto the palette.
    MalformedInput,
    /// A payload is shorter than its declared bit count.
    BufferExhausted,
    /// The pixel and repeat channels disagree on the number of runs.
    IntegrityMismatch,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MalformedInput => write!(f, "malformed input"),
            ErrorKind::BufferExhausted => write!(f, "buffer exhausted"),
            ErrorKind::IntegrityMismatch => write!(f, "integrity mismatch"),
        }
    }
}

/// Finds the [`ErrorKind`] of the first decoder error in an `anyhow` chain.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ContainerError>() {
            Some(e.kind())
        } else if let Some(e) = cause.downcast_ref::<ChannelError>() {
            Some(e.kind())
        } else {
            cause.downcast_ref::<ReconstructError>().map(|e| e.kind())
        }
    })
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("Incorrect magic: expected {expected:#010X}, got {read:#010X}")]
    InvalidMagic { expected: u32, read: u32 },

    #[error("Unknown container type: expected {expected:#06X}, got {read:#06X}")]
    UnsupportedType { expected: u16, read: u16 },

    #[error("Container data short ({field}): need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("{0} trailing bytes after the repeat channel")]
    TrailingData(usize),
}

impl ContainerError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::MalformedInput
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("Huffman leaf table is empty")]
    ZeroLeafCount,

    #[error("Huffman leaf {index} has a non-finite weight ({bits:#010X})")]
    InvalidWeight { index: usize, bits: u32 },

    #[error("Payload holds {available} bytes, {needed} needed for {bits} bits")]
    BufferExhausted {
        bits: u32,
        needed: u64,
        available: u64,
    },

    #[error(
        "{channel} channel: processing did not end on a leaf node ({bits} bits, walk at depth {depth})"
    )]
    UnterminatedSymbol {
        channel: ChannelKind,
        bits: u32,
        depth: usize,
    },

    #[error("{0} trailing bytes after the channel payload")]
    TrailingData(usize),
}

impl ChannelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChannelError::BufferExhausted { .. } => ErrorKind::BufferExhausted,
            _ => ErrorKind::MalformedInput,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    #[error(
        "Repeat data does not match pixel data: {run_markers} run markers, {repeats} repeat values"
    )]
    IntegrityMismatch { run_markers: usize, repeats: usize },

    #[error("Pixel symbol {0:#04X} is reserved and maps to no palette entry")]
    ReservedSymbol(u8),

    #[error("Pixel symbol {symbol:#04X} selects palette index {index}, palette has {entries} entries")]
    PaletteIndexOutOfRange {
        symbol: u8,
        index: usize,
        entries: usize,
    },

    #[error("Expanded pixel count {actual} does not match the {expected} pixel grid")]
    PixelCountMismatch { expected: u64, actual: u64 },
}

impl ReconstructError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconstructError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            _ => ErrorKind::MalformedInput,
        }
    }
}

#[test]
fn kind_survives_context() {
    use anyhow::{Context, anyhow};

    let err = Err::<(), _>(anyhow!(ReconstructError::IntegrityMismatch {
        run_markers: 3,
        repeats: 2
    }))
    .context("reconstructing pixels")
    .unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::IntegrityMismatch));

    let err = anyhow!(ChannelError::BufferExhausted {
        bits: 9,
        needed: 2,
        available: 1
    });
    assert_eq!(error_kind(&err), Some(ErrorKind::BufferExhausted));

    assert_eq!(error_kind(&anyhow!("unrelated")), None);
}
