//! Zen package object index

use std::fmt::Display;
use std::io::{Read, Write};
use std::mem::size_of;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;

/// Package object index type
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum EPackageObjectIndexType {
    /// Export in the current package
    Export,
    /// Engine-provided object, identified by hash
    ScriptImport,
    /// Export of another package, identified by slot pair
    PackageImport,
    /// Null
    #[default]
    Null,
}

impl Display for EPackageObjectIndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EPackageObjectIndexType::Export => "Export",
            EPackageObjectIndexType::ScriptImport => "ScriptImport",
            EPackageObjectIndexType::PackageImport => "PackageImport",
            EPackageObjectIndexType::Null => "Null",
        };
        f.write_str(name)
    }
}

/// The 64-bit tagged index used by Zen import/export tables.
///
/// The two high bits select the kind, the low 62 bits carry the payload.
/// The all-ones sentinel reads as Null (payload intact, so it round-trips).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PackageObjectIndex {
    /// Payload
    pub id: u64,
    /// Type
    pub ty: EPackageObjectIndexType,
}

impl PackageObjectIndex {
    /// Index bits
    pub const INDEX_BITS: u64 = 62;
    /// Index mask
    pub const INDEX_MASK: u64 = (1u64 << Self::INDEX_BITS).overflowing_sub(1).0;
    /// Type bit shift
    pub const TYPE_SHIFT: u64 = Self::INDEX_BITS;

    /// Create a null `PackageObjectIndex`
    pub fn null() -> Self {
        PackageObjectIndex {
            id: 0,
            ty: EPackageObjectIndexType::Null,
        }
    }

    /// Create an export `PackageObjectIndex` from a 0-based export map position
    pub fn export(index: u32) -> Self {
        PackageObjectIndex {
            id: index as u64,
            ty: EPackageObjectIndexType::Export,
        }
    }

    /// Create a script import `PackageObjectIndex` from a 62-bit object path hash
    pub fn script_import(hash: u64) -> Self {
        PackageObjectIndex {
            id: hash & Self::INDEX_MASK,
            ty: EPackageObjectIndexType::ScriptImport,
        }
    }

    /// Create a package import `PackageObjectIndex` from an imported-package
    /// slot and an imported-public-export-hash slot
    pub fn package_import(package_slot: u32, hash_slot: u32) -> Self {
        PackageObjectIndex {
            id: ((package_slot as u64) << 32 | hash_slot as u64) & Self::INDEX_MASK,
            ty: EPackageObjectIndexType::PackageImport,
        }
    }

    /// Read a `PackageObjectIndex` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let type_and_id = reader.read_u64::<LE>()?;

        let id = type_and_id & Self::INDEX_MASK;
        let ty = EPackageObjectIndexType::try_from((type_and_id >> Self::TYPE_SHIFT) as u16)?;

        Ok(PackageObjectIndex { id, ty })
    }

    /// Write a `PackageObjectIndex` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let type_and_id = self.id & Self::INDEX_MASK | ((self.ty as u64) << Self::TYPE_SHIFT);

        writer.write_u64::<LE>(type_and_id)?;

        Ok(())
    }

    /// Check if this `PackageObjectIndex` is null
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.ty == EPackageObjectIndexType::Null
    }

    /// Check if this `PackageObjectIndex` is an export
    #[inline(always)]
    pub fn is_export(&self) -> bool {
        self.ty == EPackageObjectIndexType::Export
    }

    /// Check if this `PackageObjectIndex` is a package import
    #[inline(always)]
    pub fn is_package_import(&self) -> bool {
        self.ty == EPackageObjectIndexType::PackageImport
    }

    /// Check if this `PackageObjectIndex` is a script import
    #[inline(always)]
    pub fn is_script_import(&self) -> bool {
        self.ty == EPackageObjectIndexType::ScriptImport
    }

    /// Check if this `PackageObjectIndex` is any kind of import
    #[inline(always)]
    pub fn is_import(&self) -> bool {
        self.is_package_import() || self.is_script_import()
    }

    /// Get the 0-based export map position of this export
    pub fn export_index(&self) -> Result<u32, Error> {
        match self.ty {
            EPackageObjectIndexType::Export => Ok(self.id as u32),
            other => Err(Error::wrong_index_kind("Export", &other.to_string())),
        }
    }

    /// Get the 62-bit object path hash of this script import
    pub fn script_import_id(&self) -> Result<u64, Error> {
        match self.ty {
            EPackageObjectIndexType::ScriptImport => Ok(self.id),
            other => Err(Error::wrong_index_kind("ScriptImport", &other.to_string())),
        }
    }

    /// Get the (imported-package slot, imported-public-export-hash slot) pair
    /// of this package import
    pub fn package_import_slots(&self) -> Result<(u32, u32), Error> {
        match self.ty {
            EPackageObjectIndexType::PackageImport => {
                Ok(((self.id >> 32) as u32, self.id as u32))
            }
            other => Err(Error::wrong_index_kind("PackageImport", &other.to_string())),
        }
    }

    /// Get `PackageObjectIndex` serialized size
    #[inline(always)]
    pub fn serialized_size() -> u64 {
        size_of::<u64>() as u64
    }
}

impl Default for PackageObjectIndex {
    fn default() -> Self {
        PackageObjectIndex::null()
    }
}

impl Display for PackageObjectIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x})", self.ty, self.id)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn roundtrip(index: PackageObjectIndex) -> PackageObjectIndex {
        let mut cursor = Cursor::new(Vec::new());
        index.write(&mut cursor).unwrap();
        PackageObjectIndex::read(&mut Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn classify() {
        assert!(PackageObjectIndex::null().is_null());
        assert!(PackageObjectIndex::export(7).is_export());
        assert!(PackageObjectIndex::script_import(0x1234).is_script_import());
        assert!(PackageObjectIndex::package_import(1, 2).is_package_import());
    }

    #[test]
    fn payload_accessors() {
        assert_eq!(PackageObjectIndex::export(7).export_index().unwrap(), 7);
        assert_eq!(
            PackageObjectIndex::script_import(0x1234)
                .script_import_id()
                .unwrap(),
            0x1234
        );
        assert_eq!(
            PackageObjectIndex::package_import(3, 9)
                .package_import_slots()
                .unwrap(),
            (3, 9)
        );

        assert!(matches!(
            PackageObjectIndex::null().export_index(),
            Err(Error::WrongIndexKind(_, _))
        ));
        assert!(matches!(
            PackageObjectIndex::export(0).package_import_slots(),
            Err(Error::WrongIndexKind(_, _))
        ));
    }

    #[test]
    fn all_ones_sentinel_roundtrips() {
        let mut cursor = Cursor::new(u64::MAX.to_le_bytes().to_vec());
        let index = PackageObjectIndex::read(&mut cursor).unwrap();
        assert!(index.is_null());

        let mut writer = Cursor::new(Vec::new());
        index.write(&mut writer).unwrap();
        assert_eq!(writer.into_inner(), u64::MAX.to_le_bytes());
    }

    #[test]
    fn construct_read_write() {
        for index in [
            PackageObjectIndex::null(),
            PackageObjectIndex::export(u32::MAX),
            PackageObjectIndex::script_import(PackageObjectIndex::INDEX_MASK),
            PackageObjectIndex::package_import(u32::MAX, u32::MAX),
        ] {
            assert_eq!(roundtrip(index), index);
        }
    }
}
