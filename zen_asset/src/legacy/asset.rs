//! Legacy asset reader and writer

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::mem::size_of;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{UnrealReadExt, UnrealWriteExt};

use crate::crc;
use crate::error::Error;
use crate::legacy::export::ObjectExport;
use crate::legacy::import::ObjectImport;
use crate::legacy::summary::LegacySummary;
use crate::legacy::PACKAGE_FILE_TAG;
use crate::name_map::NameMap;
use crate::types::package_index::PackageIndex;

/// A parsed legacy package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegacyAsset {
    /// Summary
    pub summary: LegacySummary,
    /// Name map
    pub name_map: NameMap,
    /// Imports
    pub imports: Vec<ObjectImport>,
    /// Exports, with payload bytes attached
    pub exports: Vec<ObjectExport>,
    /// Depends map, one list per export
    pub depends_map: Vec<Vec<i32>>,
    /// Soft package references
    pub soft_package_references: Vec<String>,
    /// The path this asset was loaded from, used for package-name derivation
    pub source_path: String,
}

impl LegacyAsset {
    /// Parse a legacy package from its header and body streams.
    ///
    /// `source_path` is the on-disk location of the header stream, kept for
    /// deriving the package name during conversion.
    pub fn read(header: &[u8], body: &[u8], source_path: &str) -> Result<Self, Error> {
        let mut reader = Cursor::new(header);

        let summary = LegacySummary::read(&mut reader)?;

        let mut asset = LegacyAsset {
            summary,
            source_path: source_path.to_string(),
            ..Default::default()
        };

        asset.read_names(&mut reader)?;
        asset.read_imports(&mut reader)?;
        asset.read_exports(&mut reader)?;
        asset.read_depends_map(&mut reader)?;
        asset.read_soft_package_references(&mut reader)?;
        asset.attach_payloads(body)?;

        Ok(asset)
    }

    fn read_names(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        reader.seek(SeekFrom::Start(self.summary.name_offset as u64))?;

        for _ in 0..self.summary.name_count {
            let name = reader
                .read_fstring()?
                .ok_or_else(|| Error::no_data("Name table entry is None".to_string()))?;
            let _non_case_preserving_hash = reader.read_u16::<LE>()?;
            let _case_preserving_hash = reader.read_u16::<LE>()?;

            self.name_map.add_name_reference(name, true);
        }

        Ok(())
    }

    fn read_imports(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        if self.summary.import_offset <= 0 {
            return Ok(());
        }

        reader.seek(SeekFrom::Start(self.summary.import_offset as u64))?;
        for _ in 0..self.summary.import_count {
            self.imports.push(ObjectImport::read(
                reader,
                self.summary.object_version_ue5,
            )?);
        }

        Ok(())
    }

    fn read_exports(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        if self.summary.export_offset <= 0 {
            return Ok(());
        }

        reader.seek(SeekFrom::Start(self.summary.export_offset as u64))?;

        let mut dependency_sizes = Vec::with_capacity(self.summary.export_count as usize);
        for _ in 0..self.summary.export_count {
            let (export, sizes) = ObjectExport::read(
                reader,
                self.summary.object_version,
                self.summary.object_version_ue5,
            )?;
            self.exports.push(export);
            dependency_sizes.push(sizes);
        }

        // the four lists per export follow in the preload-dependency stream,
        // serialize-before-serialize first
        if self.summary.preload_dependency_offset > 0 {
            for (export, sizes) in self.exports.iter_mut().zip(dependency_sizes) {
                reader.seek(SeekFrom::Start(
                    self.summary.preload_dependency_offset as u64
                        + export.first_export_dependency_offset as u64 * size_of::<i32>() as u64,
                ))?;

                let mut read_list = |count: i32| -> Result<Vec<PackageIndex>, Error> {
                    let mut list = Vec::with_capacity(count.max(0) as usize);
                    for _ in 0..count {
                        list.push(PackageIndex::read(reader)?);
                    }
                    Ok(list)
                };

                export.serialization_before_serialization_dependencies = read_list(sizes[0])?;
                export.create_before_serialization_dependencies = read_list(sizes[1])?;
                export.serialization_before_create_dependencies = read_list(sizes[2])?;
                export.create_before_create_dependencies = read_list(sizes[3])?;
            }
        }

        Ok(())
    }

    fn read_depends_map(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        if self.summary.depends_offset <= 0 {
            return Ok(());
        }

        reader.seek(SeekFrom::Start(self.summary.depends_offset as u64))?;
        for _ in 0..self.summary.export_count {
            let size = reader.read_i32::<LE>()?;
            let mut data = Vec::with_capacity(size.max(0) as usize);
            for _ in 0..size {
                data.push(reader.read_i32::<LE>()?);
            }
            self.depends_map.push(data);
        }

        Ok(())
    }

    fn read_soft_package_references(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        if self.summary.soft_package_reference_offset <= 0 {
            return Ok(());
        }

        reader.seek(SeekFrom::Start(
            self.summary.soft_package_reference_offset as u64,
        ))?;
        for _ in 0..self.summary.soft_package_reference_count {
            if let Some(reference) = reader.read_fstring()? {
                self.soft_package_references.push(reference);
            }
        }

        Ok(())
    }

    /// Slice export payloads out of the body stream.
    ///
    /// `serial_offset` is absolute across header + body, and the body carries
    /// a trailing package file tag that is not part of any payload.
    fn attach_payloads(&mut self, body: &[u8]) -> Result<(), Error> {
        let header_size = self.summary.header_offset as i64;
        let payload_end = body.len() as i64 - size_of::<u32>() as i64;

        for export in &mut self.exports {
            let start = export.serial_offset - header_size;
            let end = start + export.serial_size;

            if start < 0 || end > payload_end {
                return Err(Error::malformed(format!(
                    "Export payload ({}, {}) is out of bounds of the body stream ({})",
                    export.serial_offset, export.serial_size, body.len()
                )));
            }

            export.data = body[start as usize..end as usize].to_vec();
        }

        Ok(())
    }

    /// Serialize this asset back into (header, body) streams.
    ///
    /// Table offsets, export serial offsets and the preload-dependency
    /// cursor are recomputed; the body is terminated with the package file
    /// tag.
    pub fn write(&self) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let mut summary = self.summary.clone();

        // sections the codec doesn't carry
        summary.soft_object_paths_count = 0;
        summary.soft_object_paths_offset = 0;
        summary.gatherable_text_data_count = 0;
        summary.gatherable_text_data_offset = 0;
        summary.searchable_names_offset = 0;
        summary.thumbnail_table_offset = 0;
        summary.world_tile_info_offset = 0;
        summary.payload_toc_offset = -1;
        summary.data_resource_offset = -1;

        summary.name_count = self.name_map.len() as i32;
        summary.names_referenced_from_export_data_count = self.name_map.len() as i32;
        summary.export_count = self.exports.len() as i32;
        summary.import_count = self.imports.len() as i32;
        summary.soft_package_reference_count = self.soft_package_references.len() as i32;

        let mut writer = Cursor::new(Vec::new());

        // first pass with the offsets still unknown
        summary.write(&mut writer)?;

        summary.name_offset = match self.name_map.is_empty() {
            true => 0,
            false => writer.position() as i32,
        };
        for name in self.name_map.get_name_map_index_list() {
            writer.write_fstring(Some(name))?;
            writer.write_u16::<LE>(crc::non_case_preserving_hash(name))?;
            writer.write_u16::<LE>(crc::case_preserving_hash(name))?;
        }

        summary.import_offset = match self.imports.is_empty() {
            true => 0,
            false => writer.position() as i32,
        };
        for import in &self.imports {
            import.write(&mut writer, summary.object_version_ue5)?;
        }

        summary.export_offset = match self.exports.is_empty() {
            true => 0,
            false => writer.position() as i32,
        };
        let export_map_position = writer.position();
        for export in &self.exports {
            export.write(
                &mut writer,
                export.serial_size,
                export.serial_offset,
                export.first_export_dependency_offset,
                summary.object_version,
                summary.object_version_ue5,
            )?;
        }

        summary.depends_offset = writer.position() as i32;
        for i in 0..self.exports.len() {
            let empty = Vec::new();
            let depends = self.depends_map.get(i).unwrap_or(&empty);
            writer.write_i32::<LE>(depends.len() as i32)?;
            for depend in depends {
                writer.write_i32::<LE>(*depend)?;
            }
        }

        summary.soft_package_reference_offset = match self.soft_package_references.is_empty() {
            true => 0,
            false => writer.position() as i32,
        };
        for reference in &self.soft_package_references {
            writer.write_fstring(Some(reference))?;
        }

        summary.asset_registry_data_offset = writer.position() as i32;
        writer.write_i32::<LE>(0)?; // asset registry entry count

        summary.preload_dependency_offset = writer.position() as i32;
        summary.preload_dependency_count = 0;
        for export in &self.exports {
            for element in &export.serialization_before_serialization_dependencies {
                element.write(&mut writer)?;
            }
            for element in &export.create_before_serialization_dependencies {
                element.write(&mut writer)?;
            }
            for element in &export.serialization_before_create_dependencies {
                element.write(&mut writer)?;
            }
            for element in &export.create_before_create_dependencies {
                element.write(&mut writer)?;
            }

            summary.preload_dependency_count += export.preload_dependency_count();
        }

        summary.header_offset = writer.position() as i32;

        // body stream
        let mut body = Cursor::new(Vec::new());
        let mut payload_starts = Vec::with_capacity(self.exports.len());
        for export in &self.exports {
            payload_starts.push(summary.header_offset as i64 + body.position() as i64);
            body.write_all(&export.data)?;
        }
        body.write_u32::<LE>(PACKAGE_FILE_TAG)?;

        summary.bulk_data_start_offset =
            summary.header_offset as i64 + body.position() as i64 - size_of::<u32>() as i64;

        // second pass: export map with final offsets, then the summary
        writer.seek(SeekFrom::Start(export_map_position))?;
        let mut first_export_dependency_offset = 0;
        for (export, payload_start) in self.exports.iter().zip(payload_starts) {
            export.write(
                &mut writer,
                export.data.len() as i64,
                payload_start,
                first_export_dependency_offset,
                summary.object_version,
                summary.object_version_ue5,
            )?;
            first_export_dependency_offset += export.preload_dependency_count();
        }

        writer.seek(SeekFrom::Start(0))?;
        summary.write(&mut writer)?;

        Ok((writer.into_inner(), body.into_inner()))
    }

    /// Check the cheap structural invariants of this asset
    pub fn validate(&self) -> Result<(), Error> {
        if self.depends_map.len() > self.exports.len() {
            return Err(Error::malformed(format!(
                "Depends map has {} entries for {} exports",
                self.depends_map.len(),
                self.exports.len()
            )));
        }

        for (i, export) in self.exports.iter().enumerate() {
            for index in export
                .serialization_before_serialization_dependencies
                .iter()
                .chain(&export.create_before_serialization_dependencies)
                .chain(&export.serialization_before_create_dependencies)
                .chain(&export.create_before_create_dependencies)
            {
                let in_range = match (index.import_entry(), index.export_entry()) {
                    (Some(import), None) => import < self.imports.len(),
                    (None, Some(export)) => export < self.exports.len(),
                    _ => false,
                };
                if !in_range {
                    return Err(Error::malformed(format!(
                        "Export {i} preload dependency {index} is out of range"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Resolve the object path of an import by walking its outer chain
    pub fn import_object_path(&self, import_index: usize) -> Result<String, Error> {
        let mut segments = Vec::new();
        let mut current = Some(import_index);

        while let Some(index) = current {
            let import = self.imports.get(index).ok_or_else(|| {
                Error::malformed(format!("Import index {index} is out of range"))
            })?;

            segments.push(import.object_name.resolve_with_number(&self.name_map)?);
            current = import.outer_index.import_entry();
        }

        segments.reverse();
        Ok(segments.join("/"))
    }
}
