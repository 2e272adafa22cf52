//! Zen package reader and writer

use std::io::{Cursor, Seek, SeekFrom, Write};
use std::mem::size_of;

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;
use crate::name_map::{read_name_batch, write_name_batch, NameMap};
use crate::types::package_index::PackageIndex;
use crate::types::package_object_index::PackageObjectIndex;
use crate::version::EIoContainerHeaderVersion;
use crate::zen::bulk_data::BulkDataMapEntry;
use crate::zen::exports::{
    DependencyBundleHeader, EExportCommandType, ExportBundleEntry, ExportMapEntry,
};
use crate::zen::graph::GraphData;
use crate::zen::package_id::PackageId;
use crate::zen::summary::{ZenSummary, ZenVersioningInfo};

/// A parsed Zen package
///
/// Summary offsets and export `cooked_serial_offset` values are derived from
/// table layout; the writer recomputes them, so builders only fill the
/// semantic fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ZenPackage {
    /// Container header version this package is laid out for
    pub container_version: EIoContainerHeaderVersion,
    /// Summary
    pub summary: ZenSummary,
    /// Versioning info, present in versioned packages only
    pub versioning_info: Option<ZenVersioningInfo>,
    /// Name map
    pub name_map: NameMap,
    /// Bulk data map
    pub bulk_data_map: Vec<BulkDataMapEntry>,
    /// Imported public export hashes
    pub imported_public_export_hashes: Vec<u64>,
    /// Import map
    pub import_map: Vec<PackageObjectIndex>,
    /// Export map
    pub export_map: Vec<ExportMapEntry>,
    /// Export bundle entries
    pub export_bundle_entries: Vec<ExportBundleEntry>,
    /// Dependency bundle headers, one per export, `NoExportInfo` and later
    pub dependency_bundle_headers: Vec<DependencyBundleHeader>,
    /// Dependency bundle entries
    pub dependency_bundle_entries: Vec<PackageIndex>,
    /// Imported package names, `NoExportInfo` and later
    pub imported_package_names: Vec<String>,
    /// Graph data, before `NoExportInfo`
    pub graph_data: Option<GraphData>,
    /// Imported package ids, in `imported_package_names` order
    pub imported_packages: Vec<PackageId>,
    /// Concatenated export payload bytes
    pub payload: Vec<u8>,
}

impl Default for ZenPackage {
    fn default() -> Self {
        ZenPackage {
            container_version: EIoContainerHeaderVersion::NoExportInfo,
            summary: ZenSummary::default(),
            versioning_info: None,
            name_map: NameMap::new(),
            bulk_data_map: Vec::new(),
            imported_public_export_hashes: Vec::new(),
            import_map: Vec::new(),
            export_map: Vec::new(),
            export_bundle_entries: Vec::new(),
            dependency_bundle_headers: Vec::new(),
            dependency_bundle_entries: Vec::new(),
            imported_package_names: Vec::new(),
            graph_data: None,
            imported_packages: Vec::new(),
            payload: Vec::new(),
        }
    }
}

/// Derive a table length from two neighbouring summary offsets
fn table_len(start: i32, end: i32, entry_size: u64, what: &str) -> Result<usize, Error> {
    if start < 0 || end < start {
        return Err(Error::malformed(format!(
            "{what} table offsets are inconsistent: [{start}, {end})"
        )));
    }

    let bytes = (end - start) as u64;
    if bytes % entry_size != 0 {
        return Err(Error::malformed(format!(
            "{what} table size {bytes} is not a multiple of {entry_size}"
        )));
    }

    Ok((bytes / entry_size) as usize)
}

impl ZenPackage {
    /// Parse a Zen package from a single contiguous buffer.
    ///
    /// Packages before `NoExportInfo` need their bundle count and imported
    /// package list from the container header; use
    /// [`ZenPackage::read_with_store_entry`] for those.
    pub fn read(data: &[u8], container_version: EIoContainerHeaderVersion) -> Result<Self, Error> {
        Self::read_with_store_entry(data, container_version, 1, &[])
    }

    /// Parse a Zen package, with the export bundle header count and imported
    /// package ids recorded in the container's store entry
    pub fn read_with_store_entry(
        data: &[u8],
        container_version: EIoContainerHeaderVersion,
        export_bundle_header_count: i32,
        imported_package_ids: &[PackageId],
    ) -> Result<Self, Error> {
        let mut reader = Cursor::new(data);

        let summary = ZenSummary::read(&mut reader, container_version)?;

        let versioning_info = match summary.has_versioning_info {
            true => Some(ZenVersioningInfo::read(&mut reader)?),
            false => None,
        };

        let name_map = NameMap::from_name_batch(&read_name_batch(&mut reader)?);

        let bulk_data_size = reader.read_i64::<LE>()?;
        if bulk_data_size < 0 || bulk_data_size as u64 % BulkDataMapEntry::serialized_size() != 0 {
            return Err(Error::malformed(format!(
                "Bulk data map size {bulk_data_size} is not a multiple of {}",
                BulkDataMapEntry::serialized_size()
            )));
        }
        let bulk_data_count = (bulk_data_size as u64 / BulkDataMapEntry::serialized_size()) as usize;
        let mut bulk_data_map = Vec::with_capacity(bulk_data_count);
        for _ in 0..bulk_data_count {
            bulk_data_map.push(BulkDataMapEntry::read(&mut reader)?);
        }

        // imported public export hashes
        let imported_public_export_hashes = match container_version
            > EIoContainerHeaderVersion::Initial
        {
            true => {
                reader.seek(SeekFrom::Start(
                    summary.imported_public_export_hashes_offset as u64,
                ))?;

                let count = table_len(
                    summary.imported_public_export_hashes_offset,
                    summary.import_map_offset,
                    size_of::<u64>() as u64,
                    "Imported public export hash",
                )?;

                let mut hashes = Vec::with_capacity(count);
                for _ in 0..count {
                    hashes.push(reader.read_u64::<LE>()?);
                }
                hashes
            }
            false => Vec::new(),
        };

        // import map
        reader.seek(SeekFrom::Start(summary.import_map_offset as u64))?;
        let import_count = table_len(
            summary.import_map_offset,
            summary.export_map_offset,
            PackageObjectIndex::serialized_size(),
            "Import map",
        )?;
        let mut import_map = Vec::with_capacity(import_count);
        for _ in 0..import_count {
            import_map.push(PackageObjectIndex::read(&mut reader)?);
        }

        // export map
        reader.seek(SeekFrom::Start(summary.export_map_offset as u64))?;
        let export_count = table_len(
            summary.export_map_offset,
            summary.export_bundle_entries_offset,
            ExportMapEntry::serialized_size(),
            "Export map",
        )?;
        let mut export_map = Vec::with_capacity(export_count);
        for _ in 0..export_count {
            export_map.push(ExportMapEntry::read(&mut reader)?);
        }

        // export bundle entries
        reader.seek(SeekFrom::Start(summary.export_bundle_entries_offset as u64))?;
        let bundle_entries_end = match container_version >= EIoContainerHeaderVersion::NoExportInfo
        {
            true => summary.dependency_bundle_headers_offset.unwrap_or(0),
            false => summary.graph_data_offset.unwrap_or(0),
        };
        let bundle_entry_count = table_len(
            summary.export_bundle_entries_offset,
            bundle_entries_end,
            size_of::<u64>() as u64,
            "Export bundle entry",
        )?;
        let mut export_bundle_entries = Vec::with_capacity(bundle_entry_count);
        for _ in 0..bundle_entry_count {
            export_bundle_entries.push(ExportBundleEntry::read(&mut reader)?);
        }

        let mut package = ZenPackage {
            container_version,
            summary,
            versioning_info,
            name_map,
            bulk_data_map,
            imported_public_export_hashes,
            import_map,
            export_map,
            export_bundle_entries,
            ..Default::default()
        };

        match container_version >= EIoContainerHeaderVersion::NoExportInfo {
            true => package.read_dependency_bundles(&mut reader)?,
            false => {
                reader.seek(SeekFrom::Start(
                    package.summary.graph_data_offset.unwrap_or(0) as u64,
                ))?;
                package.graph_data = Some(GraphData::read(
                    &mut reader,
                    export_bundle_header_count,
                    imported_package_ids,
                )?);
                package.imported_packages = imported_package_ids.to_vec();
            }
        }

        // payload region
        let header_size = match package.summary.header_size {
            0 => reader.position() as usize,
            size => size as usize,
        };
        if header_size > data.len() {
            return Err(Error::malformed(format!(
                "Header size {header_size} exceeds the package size {}",
                data.len()
            )));
        }
        package.payload = data[header_size..].to_vec();

        Ok(package)
    }

    fn read_dependency_bundles(&mut self, reader: &mut Cursor<&[u8]>) -> Result<(), Error> {
        let headers_offset = self.summary.dependency_bundle_headers_offset.unwrap_or(0);
        let entries_offset = self.summary.dependency_bundle_entries_offset.unwrap_or(0);
        let names_offset = self.summary.imported_package_names_offset.unwrap_or(0);

        reader.seek(SeekFrom::Start(headers_offset as u64))?;
        let header_count = table_len(
            headers_offset,
            entries_offset,
            DependencyBundleHeader::serialized_size(),
            "Dependency bundle header",
        )?;
        for _ in 0..header_count {
            self.dependency_bundle_headers
                .push(DependencyBundleHeader::read(reader)?);
        }

        reader.seek(SeekFrom::Start(entries_offset as u64))?;
        let entry_count = table_len(
            entries_offset,
            names_offset,
            size_of::<i32>() as u64,
            "Dependency bundle entry",
        )?;
        for _ in 0..entry_count {
            self.dependency_bundle_entries
                .push(PackageIndex::read(reader)?);
        }

        reader.seek(SeekFrom::Start(names_offset as u64))?;
        self.imported_package_names = read_name_batch(reader)?;
        for _ in 0..self.imported_package_names.len() {
            let _reserved_number = reader.read_u32::<LE>()?;
        }

        self.imported_packages = self
            .imported_package_names
            .iter()
            .map(|name| PackageId::from_name(name))
            .collect();

        Ok(())
    }

    /// Serialize this package into a single contiguous buffer.
    ///
    /// Two-pass: tables are laid out first, then the summary and the export
    /// map are rewritten with the final offsets.
    pub fn write(&self) -> Result<Vec<u8>, Error> {
        let mut summary = self.summary.clone();
        summary.has_versioning_info = self.versioning_info.is_some();

        let mut writer = Cursor::new(Vec::new());

        // first pass with the offsets still unknown
        summary.write(&mut writer, self.container_version)?;

        if let Some(ref versioning_info) = self.versioning_info {
            versioning_info.write(&mut writer)?;
        }

        write_name_batch(&mut writer, self.name_map.get_name_map_index_list())?;

        writer.write_i64::<LE>(
            self.bulk_data_map.len() as i64 * BulkDataMapEntry::serialized_size() as i64,
        )?;
        for entry in &self.bulk_data_map {
            entry.write(&mut writer)?;
        }

        summary.imported_public_export_hashes_offset = writer.position() as i32;
        for hash in &self.imported_public_export_hashes {
            writer.write_u64::<LE>(*hash)?;
        }

        summary.import_map_offset = writer.position() as i32;
        for import in &self.import_map {
            import.write(&mut writer)?;
        }

        summary.export_map_offset = writer.position() as i32;
        let export_map_position = writer.position();
        for export in &self.export_map {
            export.write(&mut writer)?;
        }

        summary.export_bundle_entries_offset = writer.position() as i32;
        for entry in &self.export_bundle_entries {
            entry.write(&mut writer)?;
        }

        match self.container_version >= EIoContainerHeaderVersion::NoExportInfo {
            true => {
                summary.dependency_bundle_headers_offset = Some(writer.position() as i32);
                for header in &self.dependency_bundle_headers {
                    header.write(&mut writer)?;
                }

                summary.dependency_bundle_entries_offset = Some(writer.position() as i32);
                for entry in &self.dependency_bundle_entries {
                    entry.write(&mut writer)?;
                }

                summary.imported_package_names_offset = Some(writer.position() as i32);
                write_name_batch(&mut writer, &self.imported_package_names)?;
                for _ in 0..self.imported_package_names.len() {
                    writer.write_u32::<LE>(0)?; // reserved number suffix
                }
            }
            false => {
                summary.graph_data_offset = Some(writer.position() as i32);
                self.graph_data
                    .as_ref()
                    .ok_or_else(|| {
                        Error::no_data(
                            "container_version < NoExportInfo but graph_data is None".to_string(),
                        )
                    })?
                    .write(&mut writer)?;
            }
        }

        summary.header_size = writer.position() as u32;

        // cooked serial offsets are relative to the payload region start
        let mut export_map = self.export_map.clone();
        let mut cooked_offset = 0u64;
        for export in &mut export_map {
            export.cooked_serial_offset = cooked_offset;
            cooked_offset += export.cooked_serial_size;
        }

        writer.write_all(&self.payload)?;

        // second pass: flush the computed offsets
        let end_position = writer.position();
        writer.seek(SeekFrom::Start(0))?;
        summary.write(&mut writer, self.container_version)?;

        writer.seek(SeekFrom::Start(export_map_position))?;
        for export in &export_map {
            export.write(&mut writer)?;
        }

        writer.seek(SeekFrom::Start(end_position))?;

        Ok(writer.into_inner())
    }

    /// Resolve the package name from the summary name reference
    pub fn package_name(&self) -> Result<String, Error> {
        Ok(self.summary.name.resolve(&self.name_map)?.to_string())
    }

    /// The package id this package is keyed by
    pub fn package_id(&self) -> Result<PackageId, Error> {
        Ok(PackageId::from_name(&self.package_name()?))
    }

    /// Payload bytes of a single export
    pub fn export_payload(&self, index: usize) -> Result<&[u8], Error> {
        let export = self.export_map.get(index).ok_or_else(|| {
            Error::malformed(format!("Export index {index} is out of range"))
        })?;

        let start = export.cooked_serial_offset as usize;
        let end = start + export.cooked_serial_size as usize;
        if end > self.payload.len() {
            return Err(Error::malformed(format!(
                "Export payload ({}, {}) is out of bounds of the payload region ({})",
                export.cooked_serial_offset,
                export.cooked_serial_size,
                self.payload.len()
            )));
        }

        Ok(&self.payload[start..end])
    }

    /// Check the deeper structural invariants of this package
    pub fn validate(&self) -> Result<(), Error> {
        // every export appears exactly once per command, create first
        let export_count = self.export_map.len();
        let mut created = vec![false; export_count];
        let mut serialized = vec![false; export_count];

        for entry in &self.export_bundle_entries {
            let index = entry.local_export_index as usize;
            if index >= export_count {
                return Err(Error::malformed(format!(
                    "Bundle entry export index {index} is out of range"
                )));
            }

            match entry.command_type {
                EExportCommandType::Create => {
                    if created[index] {
                        return Err(Error::malformed(format!(
                            "Export {index} is created twice"
                        )));
                    }
                    created[index] = true;
                }
                EExportCommandType::Serialize => {
                    if !created[index] {
                        return Err(Error::malformed(format!(
                            "Export {index} is serialized before it is created"
                        )));
                    }
                    if serialized[index] {
                        return Err(Error::malformed(format!(
                            "Export {index} is serialized twice"
                        )));
                    }
                    serialized[index] = true;
                }
            }
        }

        if created.iter().any(|e| !e) || serialized.iter().any(|e| !e) {
            return Err(Error::malformed(
                "Not every export is created and serialized".to_string(),
            ));
        }

        // dependency bundle headers are contiguous over the entry array
        let mut cursor = 0u32;
        for header in &self.dependency_bundle_headers {
            if header.first_entry_index != cursor {
                return Err(Error::malformed(format!(
                    "Dependency bundle header starts at {} but the running cursor is {cursor}",
                    header.first_entry_index
                )));
            }
            cursor += header.entry_count();
        }
        if !self.dependency_bundle_headers.is_empty()
            && cursor as usize != self.dependency_bundle_entries.len()
        {
            return Err(Error::malformed(format!(
                "Dependency bundle headers cover {cursor} entries but {} were written",
                self.dependency_bundle_entries.len()
            )));
        }

        // payload accounting
        let mut cooked_offset = 0u64;
        for (i, export) in self.export_map.iter().enumerate() {
            if export.cooked_serial_offset != cooked_offset {
                return Err(Error::malformed(format!(
                    "Export {i} cooked offset {} doesn't match the running sum {cooked_offset}",
                    export.cooked_serial_offset
                )));
            }
            cooked_offset += export.cooked_serial_size;
        }
        // a trailing bulk side-file may charge overhead to the last export,
        // so the sum may exceed the payload region but never undershoot it
        if cooked_offset < self.payload.len() as u64 {
            return Err(Error::malformed(format!(
                "Export sizes sum to {cooked_offset} but the payload region is {}",
                self.payload.len()
            )));
        }

        // public export hashes go with the public flag
        for (i, export) in self.export_map.iter().enumerate() {
            let public = export
                .object_flags
                .contains(crate::flags::EObjectFlags::RF_PUBLIC);
            if public != (export.public_export_hash != 0) {
                return Err(Error::malformed(format!(
                    "Export {i} public flag and public export hash disagree"
                )));
            }
        }

        Ok(())
    }
}
