//! Zen package id

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::crc;
use crate::error::Error;

/// The 64-bit identifier keying packages inside containers.
///
/// Derived from the lowercased package path, so `/Game/A` and `/game/a`
/// address the same chunk.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    /// Id
    pub id: u64,
}

impl PackageId {
    /// Read a `PackageId` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let id = reader.read_u64::<LE>()?;
        Ok(PackageId { id })
    }

    /// Write a `PackageId` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u64::<LE>(self.id)?;
        Ok(())
    }

    /// Create a `PackageId` from a package path such as `/Game/Sub/Asset`
    pub fn from_name(name: &str) -> Self {
        let hash = crc::cityhash64_to_lower(name);
        PackageId { id: hash }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive() {
        assert_eq!(
            PackageId::from_name("/Game/A/B"),
            PackageId::from_name("/game/a/b")
        );
        assert_ne!(
            PackageId::from_name("/Game/A/B"),
            PackageId::from_name("/Game/A/C")
        );
    }
}
