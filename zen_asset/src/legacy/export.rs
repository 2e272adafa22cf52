//! Legacy export table entry

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{Guid, UnrealReadExt, UnrealWriteExt};

use crate::error::Error;
use crate::flags::EObjectFlags;
use crate::types::fname::FName;
use crate::types::package_index::PackageIndex;
use crate::version::{ObjectVersion, ObjectVersionUE5};

/// Export table entry plus its preload-dependency lists and payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectExport {
    /// Class index
    pub class_index: PackageIndex,
    /// Super index
    pub super_index: PackageIndex,
    /// Template index
    pub template_index: PackageIndex,
    /// Outer index
    pub outer_index: PackageIndex,
    /// Object name
    pub object_name: FName,
    /// Object flags
    pub object_flags: EObjectFlags,
    /// Serialized size
    pub serial_size: i64,
    /// Serialized offset, absolute within header + body
    pub serial_offset: i64,
    /// Is forced export
    pub forced_export: bool,
    /// Is not for client
    pub not_for_client: bool,
    /// Is not for server
    pub not_for_server: bool,
    /// Package guid, only serialized on old object versions
    pub package_guid: Guid,
    /// Is inherited instance
    pub is_inherited_instance: bool,
    /// Package flags
    pub package_flags: u32,
    /// Is not always loaded for editor game
    pub not_always_loaded_for_editor_game: bool,
    /// Is an asset
    pub is_asset: bool,
    /// Generate public hash
    pub generate_public_hash: bool,
    /// First dependency index into the preload-dependency stream
    pub first_export_dependency_offset: i32,

    /// Dependencies that should be serialized before this export is serialized
    pub serialization_before_serialization_dependencies: Vec<PackageIndex>,
    /// Dependencies that should be created before this export is serialized
    pub create_before_serialization_dependencies: Vec<PackageIndex>,
    /// Dependencies that should be serialized before this export is created
    pub serialization_before_create_dependencies: Vec<PackageIndex>,
    /// Dependencies that should be created before this export is created
    pub create_before_create_dependencies: Vec<PackageIndex>,

    /// Payload bytes
    pub data: Vec<u8>,
}

impl Default for ObjectExport {
    fn default() -> Self {
        ObjectExport {
            class_index: PackageIndex::null(),
            super_index: PackageIndex::null(),
            template_index: PackageIndex::null(),
            outer_index: PackageIndex::null(),
            object_name: FName::default(),
            object_flags: EObjectFlags::RF_NO_FLAGS,
            serial_size: 0,
            serial_offset: 0,
            forced_export: false,
            not_for_client: false,
            not_for_server: false,
            package_guid: Guid::default(),
            is_inherited_instance: false,
            package_flags: 0,
            not_always_loaded_for_editor_game: false,
            is_asset: false,
            generate_public_hash: false,
            first_export_dependency_offset: -1,
            serialization_before_serialization_dependencies: Vec::new(),
            create_before_serialization_dependencies: Vec::new(),
            serialization_before_create_dependencies: Vec::new(),
            create_before_create_dependencies: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl ObjectExport {
    /// Read an `ObjectExport` map entry from a reader
    ///
    /// Dependency list sizes are read here; the lists themselves live in the
    /// preload-dependency stream and are attached by the asset reader.
    pub fn read<R: Read>(
        reader: &mut R,
        object_version: i32,
        object_version_ue5: i32,
    ) -> Result<(Self, [i32; 4]), Error> {
        let class_index = PackageIndex::read(reader)?;
        let super_index = PackageIndex::read(reader)?;
        let template_index = PackageIndex::read(reader)?;
        let outer_index = PackageIndex::read(reader)?;
        let object_name = FName::read(reader)?;
        let object_flags = EObjectFlags::from_bits_retain(reader.read_u32::<LE>()?);

        let (serial_size, serial_offset) =
            match object_version >= ObjectVersion::VER_UE4_64BIT_EXPORTMAP_SERIALSIZES as i32 {
                true => (reader.read_i64::<LE>()?, reader.read_i64::<LE>()?),
                false => (
                    reader.read_i32::<LE>()? as i64,
                    reader.read_i32::<LE>()? as i64,
                ),
            };

        let forced_export = reader.read_i32::<LE>()? == 1;
        let not_for_client = reader.read_i32::<LE>()? == 1;
        let not_for_server = reader.read_i32::<LE>()? == 1;

        let package_guid = match object_version_ue5
            < ObjectVersionUE5::REMOVE_OBJECT_EXPORT_PACKAGE_GUID as i32
        {
            true => reader.read_guid()?,
            false => Guid::default(),
        };

        let is_inherited_instance = match object_version_ue5
            >= ObjectVersionUE5::TRACK_OBJECT_EXPORT_IS_INHERITED as i32
        {
            true => reader.read_i32::<LE>()? == 1,
            false => false,
        };

        let package_flags = reader.read_u32::<LE>()?;
        let not_always_loaded_for_editor_game = reader.read_i32::<LE>()? == 1;
        let is_asset = reader.read_i32::<LE>()? == 1;

        let generate_public_hash =
            match object_version_ue5 >= ObjectVersionUE5::OPTIONAL_RESOURCES as i32 {
                true => reader.read_i32::<LE>()? == 1,
                false => false,
            };

        let first_export_dependency_offset = reader.read_i32::<LE>()?;
        let serialization_before_serialization_size = reader.read_i32::<LE>()?;
        let create_before_serialization_size = reader.read_i32::<LE>()?;
        let serialization_before_create_size = reader.read_i32::<LE>()?;
        let create_before_create_size = reader.read_i32::<LE>()?;

        let export = ObjectExport {
            class_index,
            super_index,
            template_index,
            outer_index,
            object_name,
            object_flags,
            serial_size,
            serial_offset,
            forced_export,
            not_for_client,
            not_for_server,
            package_guid,
            is_inherited_instance,
            package_flags,
            not_always_loaded_for_editor_game,
            is_asset,
            generate_public_hash,
            first_export_dependency_offset,
            ..Default::default()
        };

        Ok((
            export,
            [
                serialization_before_serialization_size,
                create_before_serialization_size,
                serialization_before_create_size,
                create_before_create_size,
            ],
        ))
    }

    /// Write an `ObjectExport` map entry to a writer with explicit
    /// size/offset/dependency-cursor values
    ///
    /// The asset writer calls this twice: once with placeholders and once
    /// with the final payload layout.
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
        serial_size: i64,
        serial_offset: i64,
        first_export_dependency_offset: i32,
        object_version: i32,
        object_version_ue5: i32,
    ) -> Result<(), Error> {
        self.class_index.write(writer)?;
        self.super_index.write(writer)?;
        self.template_index.write(writer)?;
        self.outer_index.write(writer)?;
        self.object_name.write(writer)?;
        writer.write_u32::<LE>(self.object_flags.bits())?;

        match object_version >= ObjectVersion::VER_UE4_64BIT_EXPORTMAP_SERIALSIZES as i32 {
            true => {
                writer.write_i64::<LE>(serial_size)?;
                writer.write_i64::<LE>(serial_offset)?;
            }
            false => {
                writer.write_i32::<LE>(serial_size as i32)?;
                writer.write_i32::<LE>(serial_offset as i32)?;
            }
        }

        writer.write_i32::<LE>(self.forced_export as i32)?;
        writer.write_i32::<LE>(self.not_for_client as i32)?;
        writer.write_i32::<LE>(self.not_for_server as i32)?;

        if object_version_ue5 < ObjectVersionUE5::REMOVE_OBJECT_EXPORT_PACKAGE_GUID as i32 {
            writer.write_guid(&self.package_guid)?;
        }

        if object_version_ue5 >= ObjectVersionUE5::TRACK_OBJECT_EXPORT_IS_INHERITED as i32 {
            writer.write_i32::<LE>(self.is_inherited_instance as i32)?;
        }

        writer.write_u32::<LE>(self.package_flags)?;
        writer.write_i32::<LE>(self.not_always_loaded_for_editor_game as i32)?;
        writer.write_i32::<LE>(self.is_asset as i32)?;

        if object_version_ue5 >= ObjectVersionUE5::OPTIONAL_RESOURCES as i32 {
            writer.write_i32::<LE>(self.generate_public_hash as i32)?;
        }

        writer.write_i32::<LE>(first_export_dependency_offset)?;
        writer.write_i32::<LE>(
            self.serialization_before_serialization_dependencies.len() as i32,
        )?;
        writer.write_i32::<LE>(self.create_before_serialization_dependencies.len() as i32)?;
        writer.write_i32::<LE>(self.serialization_before_create_dependencies.len() as i32)?;
        writer.write_i32::<LE>(self.create_before_create_dependencies.len() as i32)?;

        Ok(())
    }

    /// Total number of preload-dependency entries of this export
    pub fn preload_dependency_count(&self) -> i32 {
        (self.serialization_before_serialization_dependencies.len()
            + self.create_before_serialization_dependencies.len()
            + self.serialization_before_create_dependencies.len()
            + self.create_before_create_dependencies.len()) as i32
    }
}
