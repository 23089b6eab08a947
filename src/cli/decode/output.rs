use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use itw::process::decode::DecodedImage;

use crate::cli::command::ImageFormat;
use crate::input::is_pipe;
use crate::pgm::PGMWriter;

/// File name used for images decoded from stdin.
pub const STDIN_STEM: &str = "stdin";

pub fn create_path_with_suffix(base_path: &Path, suffix: &str) -> PathBuf {
    let mut path = base_path.to_path_buf();
    let new_name = match base_path.file_name() {
        Some(name) => format!("{}.{}", name.to_string_lossy(), suffix),
        None => format!("{STDIN_STEM}.{suffix}"),
    };
    path.set_file_name(new_name);
    path
}

/// `<input file name>.<ext>`, next to the input or inside `output_dir`.
pub fn create_output_path(
    input: &Path,
    output_dir: Option<&Path>,
    format: ImageFormat,
) -> PathBuf {
    let ext = format.extension();

    let name = if is_pipe(input) {
        PathBuf::from(STDIN_STEM)
    } else {
        input.file_name().map(PathBuf::from).unwrap_or_default()
    };

    match output_dir {
        Some(dir) => create_path_with_suffix(&dir.join(name), ext),
        None if is_pipe(input) => create_path_with_suffix(&name, ext),
        None => create_path_with_suffix(input, ext),
    }
}

/// Encodes `image` in `format` into `writer`.
pub fn write_image<W: Write>(writer: W, image: &DecodedImage, format: ImageFormat) -> Result<()> {
    match format {
        ImageFormat::Png => {
            PngEncoder::new(writer)
                .write_image(
                    &image.pixels,
                    u32::from(image.width),
                    u32::from(image.height),
                    ExtendedColorType::L8,
                )
                .context("Encoding PNG")?;
        }
        ImageFormat::Pgm => {
            let mut pgm = PGMWriter::new(writer, image.width, image.height);
            pgm.write_pixels(&image.pixels)?;
            pgm.finish()?;
        }
        ImageFormat::Raw => {
            let mut writer = BufWriter::new(writer);
            writer.write_all(&image.pixels)?;
            writer.flush()?;
        }
    }

    Ok(())
}

pub fn write_image_file(path: &Path, image: &DecodedImage, format: ImageFormat) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    write_image(file, image, format).with_context(|| format!("Writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecodedImage {
        DecodedImage {
            width: 2,
            height: 2,
            pixels: vec![0x00, 0x40, 0x80, 0xFF],
            expanded_pixels: 4,
        }
    }

    #[test]
    fn output_paths() {
        assert_eq!(
            create_output_path(Path::new("in/photo.itw"), None, ImageFormat::Png),
            PathBuf::from("in/photo.itw.png")
        );
        assert_eq!(
            create_output_path(
                Path::new("in/photo.itw"),
                Some(Path::new("out")),
                ImageFormat::Pgm
            ),
            PathBuf::from("out/photo.itw.pgm")
        );
        assert_eq!(
            create_output_path(Path::new("-"), None, ImageFormat::Raw),
            PathBuf::from("stdin.raw")
        );
        assert_eq!(
            create_output_path(Path::new("-"), Some(Path::new("out")), ImageFormat::Png),
            PathBuf::from("out/stdin.png")
        );
    }

    #[test]
    fn raw_and_pgm_bodies() -> Result<()> {
        let mut raw = Vec::new();
        write_image(&mut raw, &sample(), ImageFormat::Raw)?;
        assert_eq!(raw, [0x00, 0x40, 0x80, 0xFF]);

        let mut pgm = Vec::new();
        write_image(&mut pgm, &sample(), ImageFormat::Pgm)?;
        assert!(pgm.starts_with(b"P5\n2 2\n255\n"));
        assert!(pgm.ends_with(&[0x00, 0x40, 0x80, 0xFF]));
        Ok(())
    }

    #[test]
    fn png_round_trip() -> Result<()> {
        let mut png = Vec::new();
        write_image(&mut png, &sample(), ImageFormat::Png)?;
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"));

        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?;
        assert_eq!(decoded.to_luma8().into_raw(), sample().pixels);
        Ok(())
    }
}
