use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Reads a whole input from a file, or from stdin when the path is `-`.
pub struct InputReader {
    reader: Box<dyn Read>,
    is_pipe: bool,
}

impl InputReader {
    pub fn new<P: AsRef<Path>>(input_path: P) -> Result<Self> {
        let input_path = input_path.as_ref();
        let is_pipe = is_pipe(input_path);

        let reader: Box<dyn Read> = if is_pipe {
            Box::new(io::stdin().lock())
        } else {
            let file = File::open(input_path)
                .with_context(|| format!("Opening {}", input_path.display()))?;
            Box::new(BufReader::new(file))
        };

        Ok(Self { reader, is_pipe })
    }

    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }

    /// Read all remaining data. Containers are decoded from memory, so this is
    /// the only way input is consumed.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

pub fn is_pipe(path: &Path) -> bool {
    path.as_os_str() == "-"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_whole_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("itwd-input-{}.itw", std::process::id()));
        std::fs::write(&path, itw::process::EXAMPLE_DATA)?;

        let mut reader = InputReader::new(&path)?;
        assert!(!reader.is_pipe());
        assert_eq!(reader.read_all()?, itw::process::EXAMPLE_DATA);

        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = InputReader::new("/nonexistent/missing.itw").err().unwrap();
        assert!(format!("{err:#}").contains("missing.itw"));
    }
}
