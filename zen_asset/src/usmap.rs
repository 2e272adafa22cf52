//! External schema (`.usmap`) name lists
//!
//! Unversioned export payloads can only be interpreted against an external
//! schema file. The codec treats payloads as opaque, so it consumes just the
//! name list for diagnostics, cached per file path.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use byteorder::{ReadBytesExt, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use zen_helpers::UnrealReadExt;

use crate::error::Error;

const USMAP_MAGIC: u16 = u16::from_be_bytes([0xc4, 0x30]);

/// Usmap file version
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EUsmapVersion {
    /// Initial version
    Initial,
    /// Packages can carry their own versioning info
    PackageVersioning,
    /// 16-bit wide name lengths
    LongFName,
    /// 32-bit enum entry counts
    LargeEnums,
}

/// Usmap compression method
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EUsmapCompressionMethod {
    /// No compression
    None,
    /// Brotli compression
    Brotli,
    /// ZStandard compression
    ZStandard,
    /// Oodle compression
    Oodle,
}

/// The name list of a parsed usmap file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsmapNames {
    /// Usmap version
    pub version: u8,
    /// Names, in file order
    pub names: Vec<String>,
}

impl UsmapNames {
    /// Parse the header and name block of a usmap file
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut reader = Cursor::new(data);

        let magic = reader.read_u16::<LE>()?;
        if magic != USMAP_MAGIC {
            return Err(Error::malformed(
                "File is not a valid usmap file".to_string(),
            ));
        }

        let version = EUsmapVersion::try_from(reader.read_u8()?)?;

        let mut has_versioning = version >= EUsmapVersion::PackageVersioning;
        if has_versioning {
            has_versioning = reader.read_bool()?;
        }

        if has_versioning {
            let _object_version = reader.read_i32::<LE>()?;
            let _object_version_ue5 = reader.read_i32::<LE>()?;
            let custom_version_count = reader.read_i32::<LE>()?;
            for _ in 0..custom_version_count {
                let mut custom_version = [0u8; 20];
                reader.read_exact(&mut custom_version)?;
            }
            let _net_cl = reader.read_u32::<LE>()?;
        }

        let compression_method = EUsmapCompressionMethod::try_from(reader.read_u8()?)?;

        let compressed_size = reader.read_u32::<LE>()?;
        let decompressed_size = reader.read_u32::<LE>()?;

        let mut compressed_data = vec![0u8; compressed_size as usize];
        reader.read_exact(&mut compressed_data)?;

        let data = match compression_method {
            EUsmapCompressionMethod::None => {
                if compressed_size != decompressed_size {
                    return Err(Error::malformed(
                        "compressed_size != decompressed_size on an uncompressed file".to_string(),
                    ));
                }

                compressed_data
            }
            EUsmapCompressionMethod::Oodle => return Err(Error::Oodle),
            other => {
                return Err(Error::UnknownCompressionMethod(
                    other.to_string().into_boxed_str(),
                ))
            }
        };

        let mut reader = Cursor::new(data.as_slice());

        let name_count = reader.read_u32::<LE>()?;
        let mut names = Vec::with_capacity(name_count as usize);
        for _ in 0..name_count {
            let len = match version >= EUsmapVersion::LongFName {
                true => reader.read_u16::<LE>()? as i32,
                false => reader.read_u8()? as i32,
            };
            names.push(reader.read_fstring_len_noterm(len, false)?);
        }

        Ok(UsmapNames {
            version: version.into(),
            names,
        })
    }
}

impl std::fmt::Display for EUsmapCompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EUsmapCompressionMethod::None => f.write_str("None"),
            EUsmapCompressionMethod::Brotli => f.write_str("Brotli"),
            EUsmapCompressionMethod::ZStandard => f.write_str("ZStandard"),
            EUsmapCompressionMethod::Oodle => f.write_str("Oodle"),
        }
    }
}

/// Path-keyed cache of usmap name lists; entries are immutable once
/// inserted, the first writer wins
#[derive(Debug, Default)]
pub struct UsmapCache {
    entries: Mutex<HashMap<PathBuf, Arc<UsmapNames>>>,
}

impl UsmapCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached name list for a file, loading it on first use
    pub fn get(&self, path: &Path) -> Result<Arc<UsmapNames>, Error> {
        if let Some(names) = self.entries.lock().unwrap().get(path) {
            return Ok(names.clone());
        }

        let data = std::fs::read(path)?;
        let names = Arc::new(UsmapNames::parse(&data)?);

        let mut entries = self.entries.lock().unwrap();
        Ok(entries
            .entry(path.to_path_buf())
            .or_insert(names)
            .clone())
    }

    /// Get the cached name list without loading; fails with `CacheMiss`
    pub fn get_cached(&self, path: &Path) -> Result<Arc<UsmapNames>, Error> {
        self.entries
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::cache_miss(format!("{} is not cached", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use byteorder::WriteBytesExt;

    use super::*;

    fn usmap_blob(names: &[&str]) -> Vec<u8> {
        let mut block = Cursor::new(Vec::new());
        block.write_u32::<LE>(names.len() as u32).unwrap();
        for name in names {
            block.write_u16::<LE>(name.len() as u16).unwrap();
            block.write_all(name.as_bytes()).unwrap();
        }
        let block = block.into_inner();

        let mut writer = Cursor::new(Vec::new());
        writer.write_u16::<LE>(USMAP_MAGIC).unwrap();
        writer.write_u8(EUsmapVersion::LongFName.into()).unwrap();
        writer.write_u8(0).unwrap(); // no versioning info
        writer.write_u8(EUsmapCompressionMethod::None.into()).unwrap();
        writer.write_u32::<LE>(block.len() as u32).unwrap();
        writer.write_u32::<LE>(block.len() as u32).unwrap();
        writer.write_all(&block).unwrap();
        writer.into_inner()
    }

    #[test]
    fn parse_names() {
        let blob = usmap_blob(&["ObjectProperty", "StaticMesh"]);
        let names = UsmapNames::parse(&blob).unwrap();
        assert_eq!(names.names, vec!["ObjectProperty", "StaticMesh"]);
    }

    #[test]
    fn bad_magic() {
        let mut blob = usmap_blob(&[]);
        blob[0] = 0;
        assert!(UsmapNames::parse(&blob).is_err());
    }
}
