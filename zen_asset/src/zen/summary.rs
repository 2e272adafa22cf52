//! Zen package summary

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{Guid, UnrealReadExt, UnrealWriteExt};

use crate::error::Error;
use crate::flags::EPackageFlags;
use crate::types::fname::FMappedName;
use crate::version::EIoContainerHeaderVersion;

/// Versioning info optionally trailing the summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZenVersioningInfo {
    /// Zen package format version
    pub zen_version: u32,
    /// Object version
    pub object_version: i32,
    /// UE5 object version
    pub object_version_ue5: i32,
    /// File licensee version
    pub file_licensee_version: i32,
    /// Custom versions, (guid, version) pairs
    pub custom_versions: Vec<(Guid, i32)>,
}

impl ZenVersioningInfo {
    /// Read a `ZenVersioningInfo` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let zen_version = reader.read_u32::<LE>()?;
        let object_version = reader.read_i32::<LE>()?;
        let object_version_ue5 = reader.read_i32::<LE>()?;
        let file_licensee_version = reader.read_i32::<LE>()?;

        let custom_version_count = reader.read_i32::<LE>()?;
        let mut custom_versions = Vec::with_capacity(custom_version_count.max(0) as usize);
        for _ in 0..custom_version_count {
            let guid = reader.read_guid()?;
            let version = reader.read_i32::<LE>()?;
            custom_versions.push((guid, version));
        }

        Ok(ZenVersioningInfo {
            zen_version,
            object_version,
            object_version_ue5,
            file_licensee_version,
            custom_versions,
        })
    }

    /// Write a `ZenVersioningInfo` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u32::<LE>(self.zen_version)?;
        writer.write_i32::<LE>(self.object_version)?;
        writer.write_i32::<LE>(self.object_version_ue5)?;
        writer.write_i32::<LE>(self.file_licensee_version)?;

        writer.write_i32::<LE>(self.custom_versions.len() as i32)?;
        for (guid, version) in &self.custom_versions {
            writer.write_guid(guid)?;
            writer.write_i32::<LE>(*version)?;
        }

        Ok(())
    }
}

/// Zen package summary
///
/// All offsets are measured from the start of the Zen header; the tables
/// they point at are contiguous and appear in summary order, so table
/// lengths are offset deltas rather than stored counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZenSummary {
    /// Has versioning info
    pub has_versioning_info: bool,
    /// Total header size
    pub header_size: u32,
    /// Package name
    pub name: FMappedName,
    /// Package flags
    pub package_flags: EPackageFlags,
    /// Byte size of the legacy header this package was cooked from
    pub cooked_header_size: u32,
    /// Imported public export hashes offset
    pub imported_public_export_hashes_offset: i32,
    /// Import map offset
    pub import_map_offset: i32,
    /// Export map offset
    pub export_map_offset: i32,
    /// Export bundle entries offset
    pub export_bundle_entries_offset: i32,
    /// Dependency bundle headers offset, `NoExportInfo` and later
    pub dependency_bundle_headers_offset: Option<i32>,
    /// Dependency bundle entries offset, `NoExportInfo` and later
    pub dependency_bundle_entries_offset: Option<i32>,
    /// Imported package names offset, `NoExportInfo` and later
    pub imported_package_names_offset: Option<i32>,
    /// Graph data offset, before `NoExportInfo`
    pub graph_data_offset: Option<i32>,
}

impl Default for ZenSummary {
    fn default() -> Self {
        ZenSummary {
            has_versioning_info: false,
            header_size: 0,
            name: FMappedName::default(),
            package_flags: EPackageFlags::PKG_NONE,
            cooked_header_size: 0,
            imported_public_export_hashes_offset: 0,
            import_map_offset: 0,
            export_map_offset: 0,
            export_bundle_entries_offset: 0,
            dependency_bundle_headers_offset: None,
            dependency_bundle_entries_offset: None,
            imported_package_names_offset: None,
            graph_data_offset: None,
        }
    }
}

impl ZenSummary {
    /// Read a `ZenSummary` from a reader
    pub fn read<R: Read>(
        reader: &mut R,
        container_version: EIoContainerHeaderVersion,
    ) -> Result<Self, Error> {
        let (has_versioning_info, header_size) =
            match container_version > EIoContainerHeaderVersion::Initial {
                true => (reader.read_u32::<LE>()? > 0, reader.read_u32::<LE>()?),
                false => (false, 0),
            };

        let name = FMappedName::read(reader)?;
        let package_flags = EPackageFlags::from_bits_retain(reader.read_u32::<LE>()?);
        let cooked_header_size = reader.read_u32::<LE>()?;

        let imported_public_export_hashes_offset =
            match container_version > EIoContainerHeaderVersion::Initial {
                true => reader.read_i32::<LE>()?,
                false => 0,
            };

        let import_map_offset = reader.read_i32::<LE>()?;
        let export_map_offset = reader.read_i32::<LE>()?;
        let export_bundle_entries_offset = reader.read_i32::<LE>()?;

        let (
            dependency_bundle_headers_offset,
            dependency_bundle_entries_offset,
            imported_package_names_offset,
            graph_data_offset,
        ) = match container_version >= EIoContainerHeaderVersion::NoExportInfo {
            true => {
                let headers = reader.read_i32::<LE>()?;
                let entries = reader.read_i32::<LE>()?;
                let names = reader.read_i32::<LE>()?;
                (Some(headers), Some(entries), Some(names), None)
            }
            false => {
                let graph_data = reader.read_i32::<LE>()?;
                (None, None, None, Some(graph_data))
            }
        };

        Ok(ZenSummary {
            has_versioning_info,
            header_size,
            name,
            package_flags,
            cooked_header_size,
            imported_public_export_hashes_offset,
            import_map_offset,
            export_map_offset,
            export_bundle_entries_offset,
            dependency_bundle_headers_offset,
            dependency_bundle_entries_offset,
            imported_package_names_offset,
            graph_data_offset,
        })
    }

    /// Write a `ZenSummary` to a writer
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
        container_version: EIoContainerHeaderVersion,
    ) -> Result<(), Error> {
        if container_version > EIoContainerHeaderVersion::Initial {
            writer.write_u32::<LE>(match self.has_versioning_info {
                true => 1,
                false => 0,
            })?;
            writer.write_u32::<LE>(self.header_size)?;
        }

        self.name.write(writer)?;
        writer.write_u32::<LE>(self.package_flags.bits())?;
        writer.write_u32::<LE>(self.cooked_header_size)?;

        if container_version > EIoContainerHeaderVersion::Initial {
            writer.write_i32::<LE>(self.imported_public_export_hashes_offset)?;
        }

        writer.write_i32::<LE>(self.import_map_offset)?;
        writer.write_i32::<LE>(self.export_map_offset)?;
        writer.write_i32::<LE>(self.export_bundle_entries_offset)?;

        if container_version >= EIoContainerHeaderVersion::NoExportInfo {
            writer.write_i32::<LE>(self.dependency_bundle_headers_offset.ok_or_else(|| {
                Error::no_data(
                    "container_version >= NoExportInfo but dependency_bundle_headers_offset is None"
                        .to_string(),
                )
            })?)?;
            writer.write_i32::<LE>(self.dependency_bundle_entries_offset.ok_or_else(|| {
                Error::no_data(
                    "container_version >= NoExportInfo but dependency_bundle_entries_offset is None"
                        .to_string(),
                )
            })?)?;
            writer.write_i32::<LE>(self.imported_package_names_offset.ok_or_else(|| {
                Error::no_data(
                    "container_version >= NoExportInfo but imported_package_names_offset is None"
                        .to_string(),
                )
            })?)?;
        } else {
            writer.write_i32::<LE>(self.graph_data_offset.ok_or_else(|| {
                Error::no_data(
                    "container_version < NoExportInfo but graph_data_offset is None".to_string(),
                )
            })?)?;
        }

        Ok(())
    }
}
