//! Container block decompression

use std::io::Read;

use flate2::bufread::{GzDecoder, ZlibDecoder};

use crate::error::Error;

/// Compression method of a container block
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// None
    #[default]
    None,
    /// Zlib compression
    Zlib,
    /// Gzip compression
    Gzip,
    /// Lz4 compression
    Lz4,
    /// Oodle compression, assumed available as an external primitive
    Oodle,
    /// Unknown compression format
    Unknown(Box<str>),
}

impl CompressionMethod {
    /// Create a new `CompressionMethod` from the method name
    pub fn new(name: &str) -> Self {
        match name {
            "None" => Self::None,
            "Zlib" => Self::Zlib,
            "Gzip" => Self::Gzip,
            "LZ4" => Self::Lz4,
            "Oodle" => Self::Oodle,
            _ => Self::Unknown(name.to_string().into_boxed_str()),
        }
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::None => f.write_str("None"),
            CompressionMethod::Zlib => f.write_str("Zlib"),
            CompressionMethod::Gzip => f.write_str("Gzip"),
            CompressionMethod::Lz4 => f.write_str("LZ4"),
            CompressionMethod::Oodle => f.write_str("Oodle"),
            CompressionMethod::Unknown(e) => write!(f, "{e}"),
        }
    }
}

/// Decompress a container block with the given compression method
pub fn decompress(
    method: CompressionMethod,
    compressed: &[u8],
    decompressed: &mut [u8],
) -> Result<(), Error> {
    match method {
        CompressionMethod::None => {
            decompressed.copy_from_slice(&compressed[..decompressed.len()]);
            Ok(())
        }
        CompressionMethod::Zlib => {
            let mut decoder = ZlibDecoder::new(compressed);
            decoder.read_exact(decompressed)?;
            Ok(())
        }
        CompressionMethod::Gzip => {
            let mut decoder = GzDecoder::new(compressed);
            decoder.read_exact(decompressed)?;
            Ok(())
        }
        CompressionMethod::Lz4 => {
            let size = lz4_flex::block::decompress_into(compressed, decompressed)?;
            if size != decompressed.len() {
                return Err(Error::malformed(format!(
                    "Lz4 block decompressed to {size} bytes, expected {}",
                    decompressed.len()
                )));
            }
            Ok(())
        }
        CompressionMethod::Oodle => Err(Error::Oodle),
        CompressionMethod::Unknown(name) => Err(Error::UnknownCompressionMethod(name)),
    }
}
