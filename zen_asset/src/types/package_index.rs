//! Legacy package index

use std::fmt::Display;
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;

/// PackageIndex is a signed reference into the legacy import/export tables.
///
/// If a PackageIndex is negative it's an index inside an import table,
/// if it's positive it's an index inside an export table.
///
/// When PackageIndex is 0 it makes for a non-existent link.
#[derive(Debug, Hash, Copy, Clone, Default, PartialEq, Eq)]
pub struct PackageIndex {
    /// Index
    pub index: i32,
}

impl PackageIndex {
    /// Create a new `PackageIndex`
    pub fn new(index: i32) -> Self {
        PackageIndex { index }
    }

    /// Create a null `PackageIndex`
    pub fn null() -> Self {
        PackageIndex { index: 0 }
    }

    /// Create a `PackageIndex` from a 0-based import table position
    pub fn from_import(import_index: i32) -> Result<Self, Error> {
        match import_index < 0 {
            true => Err(Error::malformed(
                "Import index must not be negative".to_string(),
            )),
            false => Ok(PackageIndex::new(-import_index - 1)),
        }
    }

    /// Create a `PackageIndex` from a 0-based export table position
    pub fn from_export(export_index: i32) -> Result<Self, Error> {
        match export_index < 0 {
            true => Err(Error::malformed(
                "Export index must not be negative".to_string(),
            )),
            false => Ok(PackageIndex::new(export_index + 1)),
        }
    }

    /// Check if this index is null
    pub fn is_null(&self) -> bool {
        self.index == 0
    }

    /// Check if this index refers into the import table
    pub fn is_import(&self) -> bool {
        self.index < 0
    }

    /// Check if this index refers into the export table
    pub fn is_export(&self) -> bool {
        self.index > 0
    }

    /// Get the 0-based import table position, if this is an import
    pub fn import_entry(&self) -> Option<usize> {
        match self.is_import() {
            true => Some((-self.index - 1) as usize),
            false => None,
        }
    }

    /// Get the 0-based export table position, if this is an export
    pub fn export_entry(&self) -> Option<usize> {
        match self.is_export() {
            true => Some((self.index - 1) as usize),
            false => None,
        }
    }

    /// Read a `PackageIndex` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        Ok(PackageIndex::new(reader.read_i32::<LE>()?))
    }

    /// Write a `PackageIndex` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_i32::<LE>(self.index)?;
        Ok(())
    }
}

impl Display for PackageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebra() {
        assert!(PackageIndex::null().is_null());
        assert_eq!(PackageIndex::from_export(0).unwrap().index, 1);
        assert_eq!(PackageIndex::from_import(0).unwrap().index, -1);
        assert_eq!(PackageIndex::new(3).export_entry(), Some(2));
        assert_eq!(PackageIndex::new(-3).import_entry(), Some(2));
        assert_eq!(PackageIndex::new(3).import_entry(), None);
        assert!(PackageIndex::from_export(-1).is_err());
    }
}
