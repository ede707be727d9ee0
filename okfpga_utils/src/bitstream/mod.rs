//! Utilities for working with the files that program the FPGA

use flate2::bufread::GzDecoder;
use std::{
    ffi::OsString,
    io::Read,
    path::Path,
};
use thiserror::Error;

pub mod bit;

pub use bit::BitHeader;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("The bitstream file is empty")]
    Empty,
}

/// A bitstream ready to upload, along with what we could learn about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitstream {
    /// The (decompressed) file contents, header included
    pub data: Vec<u8>,
    /// MD5 digest of the file as it was read from disk
    pub md5: [u8; 16],
    /// Parsed Xilinx `.bit` header, `None` for raw `.bin` images
    pub header: Option<BitHeader>,
    pub filename: OsString,
}

impl Bitstream {
    /// Build a bitstream from file contents, decompressing gzip'd images
    /// # Errors
    /// Returns an error on empty input or a corrupt gzip stream
    pub fn from_bytes(contents: Vec<u8>, filename: OsString) -> Result<Self, Error> {
        if contents.is_empty() {
            return Err(Error::Empty);
        }
        let md5 = md5::compute(&contents).into();
        let data = if contents.starts_with(&[0x1F, 0x8B, 0x08]) {
            let mut z = GzDecoder::new(&contents[..]);
            let mut decompressed = vec![];
            z.read_to_end(&mut decompressed)?;
            decompressed
        } else {
            contents
        };
        if data.is_empty() {
            return Err(Error::Empty);
        }
        let header = bit::bit_header(&data).ok().map(|(_, header)| header);
        Ok(Self {
            data,
            md5,
            header,
            filename,
        })
    }

    /// Get a string representation of the MD5 hash
    #[must_use]
    pub fn md5_string(&self) -> String {
        self.md5.iter().map(|v| format!("{v:02x}")).collect()
    }
}

/// Reads a bitstream file (`.bit`, `.bin`, or either gzip'd)
/// # Errors
/// Returns an error on IO failures or empty files
pub fn read_bitstream<T>(filename: T) -> Result<Bitstream, Error>
where
    T: AsRef<Path>,
{
    let path = filename.as_ref();
    let mut file = std::fs::File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    let name = path
        .file_name()
        .map_or_else(|| path.as_os_str().to_owned(), ToOwned::to_owned);
    Bitstream::from_bytes(contents, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{
        write::GzEncoder,
        Compression,
    };
    use std::io::Write;

    #[test]
    fn test_raw() {
        let bs = Bitstream::from_bytes(vec![0xDE, 0xAD, 0xBE, 0xEF], "top.bin".into()).unwrap();
        assert_eq!(bs.data, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(bs.header.is_none());
        assert_eq!(bs.md5_string(), format!("{:x}", md5::compute([0xDE, 0xAD, 0xBE, 0xEF])));
    }

    #[test]
    fn test_gzip() {
        let mut z = GzEncoder::new(Vec::new(), Compression::default());
        z.write_all(&[1, 2, 3, 4, 5]).unwrap();
        let compressed = z.finish().unwrap();
        let bs = Bitstream::from_bytes(compressed.clone(), "top.bin.gz".into()).unwrap();
        assert_eq!(bs.data, [1, 2, 3, 4, 5]);
        // The digest is of the file on disk
        assert_eq!(bs.md5, md5::compute(&compressed).0);
    }

    #[test]
    fn test_empty() {
        assert!(matches!(
            Bitstream::from_bytes(vec![], "top.bit".into()),
            Err(Error::Empty)
        ));
    }
}
