//! Container header parsing

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{ReadBytesExt, LE};

use crate::error::Error;
use crate::name_map::read_name_batch;
use crate::types::fname::FMappedName;
use crate::version::EIoContainerHeaderVersion;
use crate::zen::package_id::PackageId;

/// Sha1 hash of a shader map
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FShaHash {
    /// Value
    pub value: [u8; 20],
}

impl FShaHash {
    /// Read an `FShaHash` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut value = [0u8; 20];
        reader.read_exact(&mut value)?;
        Ok(FShaHash { value })
    }
}

/// Store entry of one package in the container header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePackageStoreEntry {
    /// Export count, before `NoExportInfo` only
    pub export_count: Option<i32>,
    /// Export bundle count, before `NoExportInfo` only
    pub export_bundle_count: Option<i32>,
    /// Imported package ids
    pub imported_packages: Vec<PackageId>,
    /// Shader map hashes
    pub shader_map_hashes: Vec<FShaHash>,
}

impl FilePackageStoreEntry {
    /// Read a `FilePackageStoreEntry` from a reader
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        version: EIoContainerHeaderVersion,
    ) -> Result<Self, Error> {
        let (export_count, export_bundle_count) =
            match version < EIoContainerHeaderVersion::NoExportInfo {
                true => {
                    let export_count = reader.read_i32::<LE>()?;
                    let export_bundle_count = reader.read_i32::<LE>()?;
                    (Some(export_count), Some(export_bundle_count))
                }
                false => (None, None),
            };

        let imported_packages = Self::read_carrayview(reader, PackageId::read)?;
        let shader_map_hashes = Self::read_carrayview(reader, FShaHash::read)?;

        Ok(FilePackageStoreEntry {
            export_count,
            export_bundle_count,
            imported_packages,
            shader_map_hashes,
        })
    }

    /// Read a `TFilePackageStoreEntryCArrayView`: a count plus an offset
    /// relative to the view's own position
    fn read_carrayview<R: Read + Seek, T>(
        reader: &mut R,
        f: impl Fn(&mut R) -> Result<T, Error>,
    ) -> Result<Vec<T>, Error> {
        let start_pos = reader.stream_position()?;

        let length = reader.read_i32::<LE>()?;
        let offset_to_data = reader.read_i32::<LE>()?;

        let next_pos = reader.stream_position()?;

        reader.seek(SeekFrom::Start(start_pos + offset_to_data as u64))?;

        let mut arr = Vec::with_capacity(length.max(0) as usize);
        for _ in 0..length {
            arr.push(f(reader)?);
        }

        reader.seek(SeekFrom::Start(next_pos))?;

        Ok(arr)
    }
}

/// Package ids and store entries of one container segment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoSegmentInfo {
    /// Package ids
    pub package_ids: Vec<PackageId>,
    /// Store entries, parallel to `package_ids`
    pub entries: Vec<FilePackageStoreEntry>,
}

impl IoSegmentInfo {
    /// Read an `IoSegmentInfo` from a reader
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        version: EIoContainerHeaderVersion,
    ) -> Result<Self, Error> {
        let package_id_count = reader.read_i32::<LE>()?;
        let mut package_ids = Vec::with_capacity(package_id_count.max(0) as usize);
        for _ in 0..package_id_count {
            package_ids.push(PackageId::read(reader)?);
        }

        let entry_count = reader.read_i32::<LE>()?;
        let mut entries = Vec::with_capacity(entry_count.max(0) as usize);
        for _ in 0..entry_count {
            entries.push(FilePackageStoreEntry::read(reader, version)?);
        }

        Ok(IoSegmentInfo {
            package_ids,
            entries,
        })
    }

    /// Find the store entry of a package id
    pub fn entry_for(&self, package_id: PackageId) -> Option<&FilePackageStoreEntry> {
        self.package_ids
            .iter()
            .position(|e| *e == package_id)
            .and_then(|i| self.entries.get(i))
    }
}

/// Localized package record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoContainerHeaderLocalizedPackage {
    /// Source package id
    pub source_package_id: PackageId,
    /// Source package name
    pub source_package_name: FMappedName,
}

impl IoContainerHeaderLocalizedPackage {
    /// Read an `IoContainerHeaderLocalizedPackage` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let source_package_id = PackageId::read(reader)?;
        let source_package_name = FMappedName::read(reader)?;

        Ok(IoContainerHeaderLocalizedPackage {
            source_package_id,
            source_package_name,
        })
    }
}

/// Package redirect record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoContainerHeaderPackageRedirect {
    /// Source package id
    pub source_package_id: PackageId,
    /// Target package id
    pub target_package_id: PackageId,
    /// Source package name
    pub source_package_name: FMappedName,
}

impl IoContainerHeaderPackageRedirect {
    /// Read an `IoContainerHeaderPackageRedirect` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let source_package_id = PackageId::read(reader)?;
        let target_package_id = PackageId::read(reader)?;
        let source_package_name = FMappedName::read(reader)?;

        Ok(IoContainerHeaderPackageRedirect {
            source_package_id,
            target_package_id,
            source_package_name,
        })
    }
}

/// Parsed container header chunk
#[derive(Debug, Clone, PartialEq)]
pub struct IoContainerHeader {
    /// Version
    pub version: EIoContainerHeaderVersion,
    /// Container id
    pub container_id: u64,
    /// Package count, before `OptionalSegmentPackages` only
    pub package_count: Option<u32>,
    /// Main segment
    pub main_segment: IoSegmentInfo,
    /// Optional segment
    pub optional_segment: Option<IoSegmentInfo>,
    /// Container name map
    pub container_name_map: Vec<String>,
    /// Localized packages
    pub localized_packages: Option<Vec<IoContainerHeaderLocalizedPackage>>,
    /// Package redirects
    pub package_redirects: Vec<IoContainerHeaderPackageRedirect>,
}

impl IoContainerHeader {
    const MAGIC: u32 = 0x496f436e;

    /// Read an `IoContainerHeader` from a container header chunk
    pub fn read(data: &[u8]) -> Result<Self, Error> {
        let mut reader = Cursor::new(data);

        let magic = reader.read_u32::<LE>()?;
        if magic != Self::MAGIC {
            return Err(Error::malformed(
                "Container header magic is invalid".to_string(),
            ));
        }

        let version = EIoContainerHeaderVersion::try_from(reader.read_u32::<LE>()?)?;

        let container_id = reader.read_u64::<LE>()?;

        let package_count = match version < EIoContainerHeaderVersion::OptionalSegmentPackages {
            true => Some(reader.read_u32::<LE>()?),
            false => None,
        };

        let main_segment = IoSegmentInfo::read(&mut reader, version)?;

        let optional_segment = match version >= EIoContainerHeaderVersion::OptionalSegmentPackages
        {
            true => Some(IoSegmentInfo::read(&mut reader, version)?),
            false => None,
        };

        let container_name_map = read_name_batch(&mut reader)?;

        let localized_packages = match version >= EIoContainerHeaderVersion::LocalizedPackages {
            true => {
                let count = reader.read_i32::<LE>()?;
                let mut packages = Vec::with_capacity(count.max(0) as usize);
                for _ in 0..count {
                    packages.push(IoContainerHeaderLocalizedPackage::read(&mut reader)?);
                }
                Some(packages)
            }
            false => None,
        };

        let redirect_count = reader.read_i32::<LE>()?;
        let mut package_redirects = Vec::with_capacity(redirect_count.max(0) as usize);
        for _ in 0..redirect_count {
            package_redirects.push(IoContainerHeaderPackageRedirect::read(&mut reader)?);
        }

        Ok(IoContainerHeader {
            version,
            container_id,
            package_count,
            main_segment,
            optional_segment,
            container_name_map,
            localized_packages,
            package_redirects,
        })
    }

    /// Find the store entry of a package id across segments
    pub fn store_entry(&self, package_id: PackageId) -> Option<&FilePackageStoreEntry> {
        self.main_segment.entry_for(package_id).or_else(|| {
            self.optional_segment
                .as_ref()
                .and_then(|e| e.entry_for(package_id))
        })
    }
}
