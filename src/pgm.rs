use std::io::{self, BufWriter, Write};

/// Magic of a binary (raw) portable graymap.
pub const PGM_MAGIC: &[u8; 2] = b"P5";

/// Largest sample value written to the header.
pub const PGM_MAXVAL: u16 = 255;

/// Binary PGM (P5) writer for 8-bit grayscale images
pub struct PGMWriter<W: Write> {
    writer: BufWriter<W>,
    width: u16,
    height: u16,
    data_written: u64,
    header_written: bool,
}

impl<W: Write> PGMWriter<W> {
    pub fn new(writer: W, width: u16, height: u16) -> Self {
        Self {
            writer: BufWriter::new(writer),
            width,
            height,
            data_written: 0,
            header_written: false,
        }
    }

    fn expected_len(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Write the text header: magic, dimensions and maxval, one per line.
    pub fn write_header(&mut self) -> io::Result<()> {
        if self.header_written {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Header already written",
            ));
        }

        self.writer.write_all(PGM_MAGIC)?;
        write!(
            self.writer,
            "\n{} {}\n{}\n",
            self.width, self.height, PGM_MAXVAL
        )?;

        self.header_written = true;
        Ok(())
    }

    /// Write row-major samples. Rows may be split across calls.
    pub fn write_pixels(&mut self, pixels: &[u8]) -> io::Result<()> {
        if !self.header_written {
            self.write_header()?;
        }

        if self.data_written + pixels.len() as u64 > self.expected_len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "More samples than the image holds",
            ));
        }

        self.writer.write_all(pixels)?;
        self.data_written += pixels.len() as u64;
        Ok(())
    }

    /// Flush and check that every sample was written.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.header_written {
            self.write_header()?;
        }

        if self.data_written != self.expected_len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Wrote {} of {} samples",
                    self.data_written,
                    self.expected_len()
                ),
            ));
        }

        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_samples() -> io::Result<()> {
        let mut writer = PGMWriter::new(Vec::new(), 3, 2);
        writer.write_pixels(&[0, 1, 2])?;
        writer.write_pixels(&[253, 254, 255])?;
        let bytes = writer.finish()?;

        assert_eq!(&bytes[..11], b"P5\n3 2\n255\n");
        assert_eq!(&bytes[11..], &[0, 1, 2, 253, 254, 255]);
        Ok(())
    }

    #[test]
    fn sample_count_is_checked() {
        let mut writer = PGMWriter::new(Vec::new(), 2, 2);
        assert!(writer.write_pixels(&[0; 5]).is_err());
        assert!(writer.finish().is_err());

        let mut writer = PGMWriter::new(Vec::new(), 2, 2);
        assert!(writer.write_header().is_ok());
        assert!(writer.write_header().is_err());
    }

    #[test]
    fn empty_image() -> io::Result<()> {
        let bytes = PGMWriter::new(Vec::new(), 0, 7).finish()?;
        assert_eq!(bytes, b"P5\n0 7\n255\n");
        Ok(())
    }
}
