//! Pixel reconstruction from the decoded pixel and repeat channels.
//!
//! With a palette of `N` entries, a pixel symbol `v` is
//!
//! - a **run marker** when `8 <= v < 8 + N`: palette entry `v - 8`, repeated
//!   `2^r` times where `r` is the next value of the repeat channel;
//! - a **single-pixel marker** when `v >= 8 + N`: palette entry `v - 8 - N`,
//!   emitted once.
//!
//! Symbols below 8 carry no palette index.

use anyhow::{Result, anyhow, bail};
use log::Level::Warn;
use log::trace;

use crate::log_or_err;
use crate::process::decode::{DecodedImage, DecoderState};
use crate::structs::header::{PALETTE_SYMBOL_BASE, Palette};
use crate::utils::errors::ReconstructError;

/// A pixel symbol resolved against the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSymbol {
    /// Gray value repeated by the next repeat-channel exponent.
    Run(u8),
    /// Gray value for exactly one pixel.
    Single(u8),
}

impl PixelSymbol {
    pub fn classify(symbol: u8, palette: &Palette) -> Result<Self> {
        let value = usize::from(symbol);
        if value < usize::from(PALETTE_SYMBOL_BASE) {
            bail!(ReconstructError::ReservedSymbol(symbol));
        }

        let base = palette.single_pixel_base();
        let (index, is_run) = if value < base {
            (value - usize::from(PALETTE_SYMBOL_BASE), true)
        } else {
            (value - base, false)
        };

        let Some(gray) = palette.get(index) else {
            bail!(ReconstructError::PaletteIndexOutOfRange {
                symbol,
                index,
                entries: palette.len(),
            });
        };

        Ok(if is_run {
            PixelSymbol::Run(gray)
        } else {
            PixelSymbol::Single(gray)
        })
    }
}

/// Number of run markers in `pixel_symbols`, i.e. how many values the repeat
/// channel must hold. Symbols below 8 count as run markers here.
pub fn count_run_markers(pixel_symbols: &[u8], palette: &Palette) -> usize {
    let base = palette.single_pixel_base();
    pixel_symbols
        .iter()
        .filter(|&&symbol| usize::from(symbol) < base)
        .count()
}

/// Pixels covered by a run with exponent `exponent`, saturating.
#[inline(always)]
pub fn run_length(exponent: u8) -> u64 {
    1u64.checked_shl(u32::from(exponent)).unwrap_or(u64::MAX)
}

/// Expands the decoded channels into a row-major `width × height` grid.
///
/// Fails with [`ReconstructError::IntegrityMismatch`] before writing anything
/// if the run-marker count differs from the number of repeat values.
pub fn reconstruct(
    state: &DecoderState,
    pixel_symbols: &[u8],
    repeat_symbols: &[u8],
    palette: &Palette,
    width: u16,
    height: u16,
) -> Result<DecodedImage> {
    let run_markers = count_run_markers(pixel_symbols, palette);
    if run_markers != repeat_symbols.len() {
        bail!(ReconstructError::IntegrityMismatch {
            run_markers,
            repeats: repeat_symbols.len(),
        });
    }

    let mut pixels = vec![0u8; usize::from(width) * usize::from(height)];
    let mut cursor = 0u64;
    let mut repeats = repeat_symbols.iter();

    for &symbol in pixel_symbols {
        let (gray, count) = match PixelSymbol::classify(symbol, palette)? {
            PixelSymbol::Run(gray) => {
                let Some(&exponent) = repeats.next() else {
                    bail!(ReconstructError::IntegrityMismatch {
                        run_markers,
                        repeats: repeat_symbols.len(),
                    });
                };
                (gray, run_length(exponent))
            }
            PixelSymbol::Single(gray) => (gray, 1),
        };

        fill(&mut pixels, cursor, count, gray);
        cursor = cursor.saturating_add(count);
    }

    trace!(
        "Reconstructed {cursor} pixels from {} symbols and {} runs",
        pixel_symbols.len(),
        run_markers
    );

    let expected = pixels.len() as u64;
    if cursor != expected {
        log_or_err!(
            state,
            Warn,
            anyhow!(ReconstructError::PixelCountMismatch {
                expected,
                actual: cursor,
            })
        );
    }

    Ok(DecodedImage {
        width,
        height,
        pixels,
        expanded_pixels: cursor,
    })
}

/// Writes `count` pixels starting at `start`, clipped to the grid.
#[inline(always)]
fn fill(pixels: &mut [u8], start: u64, count: u64, gray: u8) {
    let len = pixels.len() as u64;
    if start >= len {
        return;
    }

    let end = start.saturating_add(count).min(len);
    pixels[start as usize..end as usize].fill(gray);
}
