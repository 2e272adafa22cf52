//! Legacy package summary

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{Guid, UnrealReadExt, UnrealWriteExt};

use crate::error::Error;
use crate::flags::EPackageFlags;
use crate::legacy::PACKAGE_FILE_TAG;
use crate::version::{ObjectVersion, ObjectVersionUE5, SUPPORTED_LEGACY_FILE_VERSIONS};

/// Object versions assumed for unversioned cooked assets
pub const DEFAULT_OBJECT_VERSIONS: (i32, i32) = (
    ObjectVersion::VER_UE4_AUTOMATIC_VERSION as i32,
    ObjectVersionUE5::DATA_RESOURCES as i32,
);

/// Engine version record stored in the summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FEngineVersion {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
    /// Patch version
    pub patch: u16,
    /// Changelist
    pub build: u32,
    /// Branch name
    pub branch: Option<String>,
}

impl FEngineVersion {
    /// Read an `FEngineVersion` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let major = reader.read_u16::<LE>()?;
        let minor = reader.read_u16::<LE>()?;
        let patch = reader.read_u16::<LE>()?;
        let build = reader.read_u32::<LE>()?;
        let branch = reader.read_fstring()?;

        Ok(FEngineVersion {
            major,
            minor,
            patch,
            build,
            branch,
        })
    }

    /// Write an `FEngineVersion` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u16::<LE>(self.major)?;
        writer.write_u16::<LE>(self.minor)?;
        writer.write_u16::<LE>(self.patch)?;
        writer.write_u32::<LE>(self.build)?;
        writer.write_fstring(self.branch.as_deref())?;
        Ok(())
    }
}

/// Generation info
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GenerationInfo {
    /// Export count at this generation
    pub export_count: i32,
    /// Name count at this generation
    pub name_count: i32,
}

/// Legacy package summary
///
/// Table offsets are absolute within the header stream; fields the codec
/// doesn't inspect are preserved verbatim for re-emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacySummary {
    /// Legacy file version tag
    pub legacy_file_version: i32,
    /// Is the asset unversioned
    pub unversioned: bool,
    /// UE4 object version
    pub object_version: i32,
    /// UE5 object version
    pub object_version_ue5: i32,
    /// File licensee version
    pub file_license_version: i32,
    /// Custom versions, (guid, version) pairs
    pub custom_versions: Vec<(Guid, i32)>,
    /// Total header size
    pub header_offset: i32,
    /// Folder name
    pub folder_name: String,
    /// Package flags
    pub package_flags: EPackageFlags,
    /// Name count
    pub name_count: i32,
    /// Name table offset
    pub name_offset: i32,
    /// Soft object paths count
    pub soft_object_paths_count: i32,
    /// Soft object paths offset
    pub soft_object_paths_offset: i32,
    /// Gatherable text data count
    pub gatherable_text_data_count: i32,
    /// Gatherable text data offset
    pub gatherable_text_data_offset: i32,
    /// Export count
    pub export_count: i32,
    /// Export table offset
    pub export_offset: i32,
    /// Import count
    pub import_count: i32,
    /// Import table offset
    pub import_offset: i32,
    /// Depends map offset
    pub depends_offset: i32,
    /// Soft package reference count
    pub soft_package_reference_count: i32,
    /// Soft package reference offset
    pub soft_package_reference_offset: i32,
    /// Searchable names offset
    pub searchable_names_offset: i32,
    /// Thumbnail table offset
    pub thumbnail_table_offset: i32,
    /// Package guid
    pub package_guid: Guid,
    /// Generations
    pub generations: Vec<GenerationInfo>,
    /// Recorded engine version
    pub engine_version_recorded: FEngineVersion,
    /// Compatible engine version
    pub engine_version_compatible: FEngineVersion,
    /// Compression flags
    pub compression_flags: u32,
    /// Package source
    pub package_source: u32,
    /// Asset registry data offset
    pub asset_registry_data_offset: i32,
    /// Offset of the trailing package file tag in the body stream
    pub bulk_data_start_offset: i64,
    /// World tile info offset
    pub world_tile_info_offset: i32,
    /// Chunk ids
    pub chunk_ids: Vec<i32>,
    /// Preload dependency count
    pub preload_dependency_count: i32,
    /// Preload dependency offset
    pub preload_dependency_offset: i32,
    /// Amount of names referenced from export payloads
    pub names_referenced_from_export_data_count: i32,
    /// TOC payload offset
    pub payload_toc_offset: i64,
    /// Data resource offset
    pub data_resource_offset: i32,
}

impl Default for LegacySummary {
    fn default() -> Self {
        LegacySummary {
            legacy_file_version: -8,
            unversioned: true,
            object_version: DEFAULT_OBJECT_VERSIONS.0,
            object_version_ue5: DEFAULT_OBJECT_VERSIONS.1,
            file_license_version: 0,
            custom_versions: Vec::new(),
            header_offset: 0,
            folder_name: String::from("None"),
            package_flags: EPackageFlags::PKG_NONE,
            name_count: 0,
            name_offset: 0,
            soft_object_paths_count: 0,
            soft_object_paths_offset: 0,
            gatherable_text_data_count: 0,
            gatherable_text_data_offset: 0,
            export_count: 0,
            export_offset: 0,
            import_count: 0,
            import_offset: 0,
            depends_offset: 0,
            soft_package_reference_count: 0,
            soft_package_reference_offset: 0,
            searchable_names_offset: 0,
            thumbnail_table_offset: 0,
            package_guid: Guid::default(),
            generations: Vec::new(),
            engine_version_recorded: FEngineVersion::default(),
            engine_version_compatible: FEngineVersion::default(),
            compression_flags: 0,
            package_source: 0,
            asset_registry_data_offset: 0,
            bulk_data_start_offset: 0,
            world_tile_info_offset: 0,
            chunk_ids: Vec::new(),
            preload_dependency_count: 0,
            preload_dependency_offset: 0,
            names_referenced_from_export_data_count: 0,
            payload_toc_offset: 0,
            data_resource_offset: 0,
        }
    }
}

impl LegacySummary {
    /// Read a `LegacySummary` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut summary = LegacySummary::default();

        if reader.read_u32::<LE>()? != PACKAGE_FILE_TAG {
            return Err(Error::malformed(
                "File is not a valid package header".to_string(),
            ));
        }

        summary.legacy_file_version = reader.read_i32::<LE>()?;
        if !SUPPORTED_LEGACY_FILE_VERSIONS.contains(&summary.legacy_file_version) {
            return Err(Error::unsupported_version(format!(
                "Unsupported legacy file version {}",
                summary.legacy_file_version
            )));
        }

        // LegacyUE3Version, always present in this band
        let _legacy_ue3_version = reader.read_i32::<LE>()?;

        let object_version = reader.read_i32::<LE>()?;
        summary.unversioned = object_version == 0;
        if !summary.unversioned {
            summary.object_version = object_version;
        }

        if summary.legacy_file_version <= -8 {
            let object_version_ue5 = reader.read_i32::<LE>()?;
            if object_version_ue5 > 0 {
                summary.object_version_ue5 = object_version_ue5;
            } else if !summary.unversioned {
                summary.object_version_ue5 = 0;
            }
        } else {
            summary.object_version_ue5 = 0;
        }

        summary.file_license_version = reader.read_i32::<LE>()?;

        let custom_version_count = reader.read_i32::<LE>()?;
        for _ in 0..custom_version_count {
            let guid = reader.read_guid()?;
            let version = reader.read_i32::<LE>()?;
            summary.custom_versions.push((guid, version));
        }

        summary.header_offset = reader.read_i32::<LE>()?;
        summary.folder_name = reader.read_fstring()?.unwrap_or_default();
        summary.package_flags = EPackageFlags::from_bits_retain(reader.read_u32::<LE>()?);

        summary.name_count = reader.read_i32::<LE>()?;
        summary.name_offset = reader.read_i32::<LE>()?;

        if summary.object_version_ue5 >= ObjectVersionUE5::ADD_SOFTOBJECTPATH_LIST as i32 {
            summary.soft_object_paths_count = reader.read_i32::<LE>()?;
            summary.soft_object_paths_offset = reader.read_i32::<LE>()?;
        }

        if summary.object_version >= ObjectVersion::VER_UE4_SERIALIZE_TEXT_IN_PACKAGES as i32 {
            summary.gatherable_text_data_count = reader.read_i32::<LE>()?;
            summary.gatherable_text_data_offset = reader.read_i32::<LE>()?;
        }

        summary.export_count = reader.read_i32::<LE>()?;
        summary.export_offset = reader.read_i32::<LE>()?;
        summary.import_count = reader.read_i32::<LE>()?;
        summary.import_offset = reader.read_i32::<LE>()?;
        summary.depends_offset = reader.read_i32::<LE>()?;

        if summary.object_version
            >= ObjectVersion::VER_UE4_ADD_STRING_ASSET_REFERENCES_MAP as i32
        {
            summary.soft_package_reference_count = reader.read_i32::<LE>()?;
            summary.soft_package_reference_offset = reader.read_i32::<LE>()?;
        }

        if summary.object_version >= ObjectVersion::VER_UE4_ADDED_SEARCHABLE_NAMES as i32 {
            summary.searchable_names_offset = reader.read_i32::<LE>()?;
        }

        summary.thumbnail_table_offset = reader.read_i32::<LE>()?;
        summary.package_guid = reader.read_guid()?;

        let generations_count = reader.read_i32::<LE>()?;
        for _ in 0..generations_count {
            let export_count = reader.read_i32::<LE>()?;
            let name_count = reader.read_i32::<LE>()?;
            summary.generations.push(GenerationInfo {
                export_count,
                name_count,
            });
        }

        summary.engine_version_recorded = FEngineVersion::read(reader)?;
        summary.engine_version_compatible = FEngineVersion::read(reader)?;

        summary.compression_flags = reader.read_u32::<LE>()?;
        let compression_block_count = reader.read_u32::<LE>()?;
        if compression_block_count > 0 {
            return Err(Error::malformed(
                "Compression block count is not zero".to_string(),
            ));
        }

        summary.package_source = reader.read_u32::<LE>()?;

        let additional_to_cook = reader.read_i32::<LE>()?;
        if additional_to_cook != 0 {
            return Err(Error::malformed(
                "Additional packages to cook is not zero".to_string(),
            ));
        }

        if summary.legacy_file_version > -7 {
            let texture_allocations_count = reader.read_i32::<LE>()?;
            if texture_allocations_count != 0 {
                return Err(Error::malformed(
                    "Texture allocations count is not zero".to_string(),
                ));
            }
        }

        summary.asset_registry_data_offset = reader.read_i32::<LE>()?;
        summary.bulk_data_start_offset = reader.read_i64::<LE>()?;

        if summary.object_version >= ObjectVersion::VER_UE4_WORLD_LEVEL_INFO as i32 {
            summary.world_tile_info_offset = reader.read_i32::<LE>()?;
        }

        let chunk_id_count = reader.read_i32::<LE>()?;
        for _ in 0..chunk_id_count {
            summary.chunk_ids.push(reader.read_i32::<LE>()?);
        }

        if summary.object_version
            >= ObjectVersion::VER_UE4_PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS as i32
        {
            summary.preload_dependency_count = reader.read_i32::<LE>()?;
            summary.preload_dependency_offset = reader.read_i32::<LE>()?;
        }

        summary.names_referenced_from_export_data_count = match summary.object_version_ue5
            >= ObjectVersionUE5::NAMES_REFERENCED_FROM_EXPORT_DATA as i32
        {
            true => reader.read_i32::<LE>()?,
            false => summary.name_count,
        };

        if summary.object_version_ue5 >= ObjectVersionUE5::PAYLOAD_TOC as i32 {
            summary.payload_toc_offset = reader.read_i64::<LE>()?;
        }

        if summary.object_version_ue5 >= ObjectVersionUE5::DATA_RESOURCES as i32 {
            summary.data_resource_offset = reader.read_i32::<LE>()?;
        }

        Ok(summary)
    }

    /// Write a `LegacySummary` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u32::<LE>(PACKAGE_FILE_TAG)?;
        writer.write_i32::<LE>(self.legacy_file_version)?;

        match self.unversioned {
            true => writer.write_i32::<LE>(0)?,
            false => writer.write_i32::<LE>(864)?,
        };

        match self.unversioned {
            true => writer.write_i32::<LE>(0)?,
            false => writer.write_i32::<LE>(self.object_version)?,
        };

        if self.legacy_file_version <= -8 {
            match self.unversioned {
                true => writer.write_i32::<LE>(0)?,
                false => writer.write_i32::<LE>(self.object_version_ue5)?,
            };
        }

        writer.write_i32::<LE>(self.file_license_version)?;

        match self.unversioned {
            true => writer.write_i32::<LE>(0)?,
            false => {
                writer.write_i32::<LE>(self.custom_versions.len() as i32)?;
                for (guid, version) in &self.custom_versions {
                    writer.write_guid(guid)?;
                    writer.write_i32::<LE>(*version)?;
                }
            }
        };

        writer.write_i32::<LE>(self.header_offset)?;
        writer.write_fstring(Some(&self.folder_name))?;
        writer.write_u32::<LE>(self.package_flags.bits())?;
        writer.write_i32::<LE>(self.name_count)?;
        writer.write_i32::<LE>(self.name_offset)?;

        if self.object_version_ue5 >= ObjectVersionUE5::ADD_SOFTOBJECTPATH_LIST as i32 {
            writer.write_i32::<LE>(self.soft_object_paths_count)?;
            writer.write_i32::<LE>(self.soft_object_paths_offset)?;
        }

        if self.object_version >= ObjectVersion::VER_UE4_SERIALIZE_TEXT_IN_PACKAGES as i32 {
            writer.write_i32::<LE>(self.gatherable_text_data_count)?;
            writer.write_i32::<LE>(self.gatherable_text_data_offset)?;
        }

        writer.write_i32::<LE>(self.export_count)?;
        writer.write_i32::<LE>(self.export_offset)?;
        writer.write_i32::<LE>(self.import_count)?;
        writer.write_i32::<LE>(self.import_offset)?;
        writer.write_i32::<LE>(self.depends_offset)?;

        if self.object_version >= ObjectVersion::VER_UE4_ADD_STRING_ASSET_REFERENCES_MAP as i32 {
            writer.write_i32::<LE>(self.soft_package_reference_count)?;
            writer.write_i32::<LE>(self.soft_package_reference_offset)?;
        }

        if self.object_version >= ObjectVersion::VER_UE4_ADDED_SEARCHABLE_NAMES as i32 {
            writer.write_i32::<LE>(self.searchable_names_offset)?;
        }

        writer.write_i32::<LE>(self.thumbnail_table_offset)?;
        writer.write_guid(&self.package_guid)?;

        writer.write_i32::<LE>(self.generations.len() as i32)?;
        for generation in &self.generations {
            writer.write_i32::<LE>(generation.export_count)?;
            writer.write_i32::<LE>(generation.name_count)?;
        }

        self.engine_version_recorded.write(writer)?;
        self.engine_version_compatible.write(writer)?;

        writer.write_u32::<LE>(self.compression_flags)?;
        writer.write_i32::<LE>(0)?; // numCompressedChunks
        writer.write_u32::<LE>(self.package_source)?;
        writer.write_i32::<LE>(0)?; // numAdditionalPackagesToCook

        if self.legacy_file_version > -7 {
            writer.write_i32::<LE>(0)?; // numTextureAllocations
        }

        writer.write_i32::<LE>(self.asset_registry_data_offset)?;
        writer.write_i64::<LE>(self.bulk_data_start_offset)?;

        if self.object_version >= ObjectVersion::VER_UE4_WORLD_LEVEL_INFO as i32 {
            writer.write_i32::<LE>(self.world_tile_info_offset)?;
        }

        writer.write_i32::<LE>(self.chunk_ids.len() as i32)?;
        for chunk_id in &self.chunk_ids {
            writer.write_i32::<LE>(*chunk_id)?;
        }

        if self.object_version
            >= ObjectVersion::VER_UE4_PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS as i32
        {
            writer.write_i32::<LE>(self.preload_dependency_count)?;
            writer.write_i32::<LE>(self.preload_dependency_offset)?;
        }

        if self.object_version_ue5 >= ObjectVersionUE5::NAMES_REFERENCED_FROM_EXPORT_DATA as i32 {
            writer.write_i32::<LE>(self.names_referenced_from_export_data_count)?;
        }

        if self.object_version_ue5 >= ObjectVersionUE5::PAYLOAD_TOC as i32 {
            writer.write_i64::<LE>(self.payload_toc_offset)?;
        }

        if self.object_version_ue5 >= ObjectVersionUE5::DATA_RESOURCES as i32 {
            writer.write_i32::<LE>(self.data_resource_offset)?;
        }

        Ok(())
    }
}
