//! Zen export map, bundle and dependency records

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;
use crate::flags::{EExportFilterFlags, EObjectFlags};
use crate::types::fname::FMappedName;
use crate::types::package_index::PackageIndex;
use crate::types::package_object_index::PackageObjectIndex;

/// Zen export map entry, a fixed 72 bytes on disk
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExportMapEntry {
    /// Serialized offset, relative to the start of the export payload region
    pub cooked_serial_offset: u64,
    /// Serialized size
    pub cooked_serial_size: u64,
    /// Object name
    pub object_name: FMappedName,
    /// Outer index
    pub outer_index: PackageObjectIndex,
    /// Class index
    pub class_index: PackageObjectIndex,
    /// Super index
    pub super_index: PackageObjectIndex,
    /// Template index
    pub template_index: PackageObjectIndex,
    /// Hash other packages address this export by, nonzero iff public
    pub public_export_hash: u64,
    /// Object flags
    pub object_flags: EObjectFlags,
    /// Filter flags
    pub filter_flags: EExportFilterFlags,
}

impl Default for ExportMapEntry {
    fn default() -> Self {
        ExportMapEntry {
            cooked_serial_offset: 0,
            cooked_serial_size: 0,
            object_name: FMappedName::default(),
            outer_index: PackageObjectIndex::null(),
            class_index: PackageObjectIndex::null(),
            super_index: PackageObjectIndex::null(),
            template_index: PackageObjectIndex::null(),
            public_export_hash: 0,
            object_flags: EObjectFlags::RF_NO_FLAGS,
            filter_flags: EExportFilterFlags::None,
        }
    }
}

impl ExportMapEntry {
    /// Read an `ExportMapEntry` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let cooked_serial_offset = reader.read_u64::<LE>()?;
        let cooked_serial_size = reader.read_u64::<LE>()?;

        let object_name = FMappedName::read(reader)?;

        let outer_index = PackageObjectIndex::read(reader)?;
        let class_index = PackageObjectIndex::read(reader)?;
        let super_index = PackageObjectIndex::read(reader)?;
        let template_index = PackageObjectIndex::read(reader)?;

        let public_export_hash = reader.read_u64::<LE>()?;

        let object_flags = EObjectFlags::from_bits_retain(reader.read_u32::<LE>()?);
        let filter_flags = EExportFilterFlags::try_from(reader.read_u8()?)?;

        let mut padding = [0u8; 3];
        reader.read_exact(&mut padding)?;

        Ok(ExportMapEntry {
            cooked_serial_offset,
            cooked_serial_size,
            object_name,
            outer_index,
            class_index,
            super_index,
            template_index,
            public_export_hash,
            object_flags,
            filter_flags,
        })
    }

    /// Write an `ExportMapEntry` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u64::<LE>(self.cooked_serial_offset)?;
        writer.write_u64::<LE>(self.cooked_serial_size)?;

        self.object_name.write(writer)?;

        self.outer_index.write(writer)?;
        self.class_index.write(writer)?;
        self.super_index.write(writer)?;
        self.template_index.write(writer)?;

        writer.write_u64::<LE>(self.public_export_hash)?;

        writer.write_u32::<LE>(self.object_flags.bits())?;
        writer.write_u8(self.filter_flags.into())?;

        writer.write_all(&[0u8; 3])?;
        Ok(())
    }

    /// Get `ExportMapEntry` serialized size
    #[inline(always)]
    pub fn serialized_size() -> u64 {
        72
    }
}

/// Export bundle command type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum EExportCommandType {
    /// Create the export object
    Create,
    /// Serialize the export payload
    Serialize,
}

/// Export bundle entry
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExportBundleEntry {
    /// Local export index
    pub local_export_index: u32,
    /// Command type
    pub command_type: EExportCommandType,
}

impl ExportBundleEntry {
    /// Read an `ExportBundleEntry` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let local_export_index = reader.read_u32::<LE>()?;
        let command_type = EExportCommandType::try_from(reader.read_u32::<LE>()?)?;

        Ok(ExportBundleEntry {
            local_export_index,
            command_type,
        })
    }

    /// Write an `ExportBundleEntry` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u32::<LE>(self.local_export_index)?;
        writer.write_u32::<LE>(self.command_type as u32)?;

        Ok(())
    }
}

/// Export bundle header, used by graph data before `NoExportInfo`
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExportBundleHeader {
    /// Serialized offset of the bundle payload
    pub serial_offset: u64,
    /// First entry index
    pub first_entry_index: u32,
    /// Entry count
    pub entry_count: u32,
}

impl ExportBundleHeader {
    /// Read an `ExportBundleHeader` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let serial_offset = reader.read_u64::<LE>()?;
        let first_entry_index = reader.read_u32::<LE>()?;
        let entry_count = reader.read_u32::<LE>()?;

        Ok(ExportBundleHeader {
            serial_offset,
            first_entry_index,
            entry_count,
        })
    }

    /// Write an `ExportBundleHeader` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u64::<LE>(self.serial_offset)?;
        writer.write_u32::<LE>(self.first_entry_index)?;
        writer.write_u32::<LE>(self.entry_count)?;

        Ok(())
    }
}

/// Dependency bundle header, one per export
///
/// `first_entry_index` points into the dependency bundle entry array, the
/// four counts cover the lists in create-before-create, serialize-before-
/// create, create-before-serialize, serialize-before-serialize order.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct DependencyBundleHeader {
    /// First entry index
    pub first_entry_index: u32,
    /// Create-before-create entry count
    pub create_before_create: u32,
    /// Serialize-before-create entry count
    pub serialize_before_create: u32,
    /// Create-before-serialize entry count
    pub create_before_serialize: u32,
    /// Serialize-before-serialize entry count
    pub serialize_before_serialize: u32,
}

impl DependencyBundleHeader {
    /// Read a `DependencyBundleHeader` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let first_entry_index = reader.read_u32::<LE>()?;
        let create_before_create = reader.read_u32::<LE>()?;
        let serialize_before_create = reader.read_u32::<LE>()?;
        let create_before_serialize = reader.read_u32::<LE>()?;
        let serialize_before_serialize = reader.read_u32::<LE>()?;

        Ok(DependencyBundleHeader {
            first_entry_index,
            create_before_create,
            serialize_before_create,
            create_before_serialize,
            serialize_before_serialize,
        })
    }

    /// Write a `DependencyBundleHeader` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u32::<LE>(self.first_entry_index)?;
        writer.write_u32::<LE>(self.create_before_create)?;
        writer.write_u32::<LE>(self.serialize_before_create)?;
        writer.write_u32::<LE>(self.create_before_serialize)?;
        writer.write_u32::<LE>(self.serialize_before_serialize)?;

        Ok(())
    }

    /// Total number of entries covered by this header
    pub fn entry_count(&self) -> u32 {
        self.create_before_create
            + self.serialize_before_create
            + self.create_before_serialize
            + self.serialize_before_serialize
    }

    /// Get `DependencyBundleHeader` serialized size
    #[inline(always)]
    pub fn serialized_size() -> u64 {
        20
    }
}

/// Dependency bundle entry: a single legacy package index
pub type DependencyBundleEntry = PackageIndex;
