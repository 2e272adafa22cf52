//! Package context: loaded containers plus cross-package resolution

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::sync::{Arc, Mutex};

use crate::container::chunk::{EIoChunkType, IoChunkId};
use crate::container::header::IoContainerHeader;
use crate::container::provider::IoStoreProvider;
use crate::container::reader::IoStoreReader;
use crate::error::{ContainerError, Error};
use crate::script_objects::ScriptObjectDatabase;
use crate::version::EIoContainerHeaderVersion;
use crate::zen::exports::ExportMapEntry;
use crate::zen::package::ZenPackage;
use crate::zen::package_id::PackageId;

/// One loaded container: chunk access plus its parsed header
pub struct Container<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    /// Chunk reader
    pub reader: IoStoreReader<R, P>,
    /// Parsed container header chunk, absent for raw utility containers
    pub header: Option<IoContainerHeader>,
    /// Path → toc entry index, derived from the directory index
    pub path_index: HashMap<String, u32>,
}

impl<R, P> Container<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    /// Wrap a chunk reader, parsing the container header chunk if present
    pub fn new(reader: IoStoreReader<R, P>) -> Result<Self, Error> {
        let header = reader
            .read_chunk(&IoChunkId::new(0, 0, EIoChunkType::ContainerHeader))?
            .map(|data| IoContainerHeader::read(&data))
            .transpose()?;

        let path_index = reader
            .toc_resource
            .directory_index
            .as_ref()
            .map(|index| index.build_index_map())
            .unwrap_or_default();

        Ok(Container {
            reader,
            header,
            path_index,
        })
    }
}

/// Resolves cross-package references while rebuilding, caching parsed Zen
/// packages by package id.
///
/// Containers are consulted in load order; `load` with `override_priority`
/// puts a container in front so later mounts win on duplicate package ids.
/// The cache is single-writer/many-readers: readers clone the `Arc` out of
/// the map and never block insertions afterwards.
pub struct PackageContext<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    containers: Vec<Container<R, P>>,
    script_objects: Option<Arc<ScriptObjectDatabase>>,
    cache: Mutex<HashMap<PackageId, Arc<ZenPackage>>>,
}

impl<R, P> Default for PackageContext<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    fn default() -> Self {
        PackageContext {
            containers: Vec::new(),
            script_objects: None,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<R, P> PackageContext<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a container; with `override_priority` it is consulted before
    /// everything loaded so far
    pub fn load(&mut self, container: Container<R, P>, override_priority: bool) {
        // a container carrying script objects provides the database
        if self.script_objects.is_none() {
            if let Ok(Some(data)) = container
                .reader
                .read_chunk(&IoChunkId::new(0, 0, EIoChunkType::ScriptObjects))
            {
                if let Ok(database) = ScriptObjectDatabase::read(&data) {
                    self.script_objects = Some(Arc::new(database));
                }
            }
        }

        match override_priority {
            true => self.containers.insert(0, container),
            false => self.containers.push(container),
        }
    }

    /// The loaded containers, in priority order
    pub fn containers(&self) -> &[Container<R, P>] {
        &self.containers
    }

    /// The script object database, if a loaded container carried one
    pub fn script_objects(&self) -> Option<Arc<ScriptObjectDatabase>> {
        self.script_objects.clone()
    }

    /// Replace the script object database
    pub fn set_script_objects(&mut self, database: Arc<ScriptObjectDatabase>) {
        self.script_objects = Some(database);
    }

    /// All package ids with an `ExportBundleData` chunk, in priority order
    pub fn package_ids(&self) -> Vec<PackageId> {
        let mut ids = Vec::new();
        for container in &self.containers {
            for chunk_id in &container.reader.toc_resource.chunk_ids {
                if chunk_id.chunk_type == EIoChunkType::ExportBundleData as u8 {
                    let id = PackageId { id: chunk_id.chunk_id };
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }
        ids
    }

    /// Find the path recorded for a package chunk in the directory indices
    pub fn package_path(&self, package_id: PackageId) -> Option<String> {
        for container in &self.containers {
            for (path, toc_index) in &container.path_index {
                let Some(chunk_id) = container
                    .reader
                    .toc_resource
                    .chunk_ids
                    .get(*toc_index as usize)
                else {
                    continue;
                };
                if chunk_id.chunk_id == package_id.id
                    && chunk_id.chunk_type == EIoChunkType::ExportBundleData as u8
                {
                    return Some(path.clone());
                }
            }
        }
        None
    }

    /// Get a parsed Zen package by id, lazily and cached.
    ///
    /// First writer wins the cache slot; later callers get the cached `Arc`.
    pub fn get(&self, package_id: PackageId) -> Result<Arc<ZenPackage>, Error> {
        if let Some(package) = self.cache.lock().unwrap().get(&package_id) {
            return Ok(package.clone());
        }

        let package = Arc::new(self.parse_package(package_id)?);

        let mut cache = self.cache.lock().unwrap();
        Ok(cache.entry(package_id).or_insert(package).clone())
    }

    fn parse_package(&self, package_id: PackageId) -> Result<ZenPackage, Error> {
        for container in &self.containers {
            let chunk_id =
                IoChunkId::from_package_id(package_id, 0, EIoChunkType::ExportBundleData);
            let Some(data) = container.reader.read_chunk(&chunk_id)? else {
                continue;
            };

            let version = container
                .header
                .as_ref()
                .map(|e| e.version)
                .unwrap_or(EIoContainerHeaderVersion::NoExportInfo);

            let store_entry = container
                .header
                .as_ref()
                .and_then(|e| e.store_entry(package_id));

            return match version >= EIoContainerHeaderVersion::NoExportInfo {
                true => ZenPackage::read(&data, version),
                false => {
                    let bundle_count = store_entry
                        .and_then(|e| e.export_bundle_count)
                        .unwrap_or(1);
                    let imported = store_entry
                        .map(|e| e.imported_packages.clone())
                        .unwrap_or_default();
                    ZenPackage::read_with_store_entry(&data, version, bundle_count, &imported)
                }
            };
        }

        Err(ContainerError::no_chunk(&format!("ExportBundleData {:#x}", package_id.id)).into())
    }

    /// Drop every cached package
    pub fn evict_all(&self) {
        self.cache.lock().unwrap().clear();
    }

    /// Resolve a package import of `source` to its target package and
    /// export map entry
    pub fn resolve_import(
        &self,
        source: &ZenPackage,
        import_index: usize,
    ) -> Result<(Arc<ZenPackage>, usize, ExportMapEntry), Error> {
        let import = source.import_map.get(import_index).ok_or_else(|| {
            Error::malformed(format!("Import index {import_index} is out of range"))
        })?;

        let (package_slot, hash_slot) = import.package_import_slots()?;

        let package_id = *source
            .imported_packages
            .get(package_slot as usize)
            .ok_or_else(|| {
                Error::unresolved(format!(
                    "Imported package slot {package_slot} is out of range"
                ))
            })?;
        let export_hash = *source
            .imported_public_export_hashes
            .get(hash_slot as usize)
            .ok_or_else(|| {
                Error::unresolved(format!(
                    "Imported public export hash slot {hash_slot} is out of range"
                ))
            })?;

        let target = self.get(package_id)?;

        let export_index = target
            .export_map
            .iter()
            .position(|e| e.public_export_hash == export_hash)
            .ok_or_else(|| {
                Error::unresolved(format!(
                    "No export with public hash {export_hash:#x} in package {:#x}",
                    package_id.id
                ))
            })?;

        let entry = target.export_map[export_index];
        Ok((target, export_index, entry))
    }

    /// Concatenate all `BulkData` chunks of a package, ordered by their
    /// secondary chunk index
    pub fn read_bulk(&self, package_id: PackageId) -> Result<Vec<u8>, Error> {
        let mut chunks = Vec::new();

        for container in &self.containers {
            for chunk_id in &container.reader.toc_resource.chunk_ids {
                if chunk_id.chunk_id == package_id.id
                    && chunk_id.chunk_type == EIoChunkType::BulkData as u8
                    && !chunks.iter().any(|(index, _)| *index == chunk_id.chunk_index)
                {
                    if let Some(data) = container.reader.read_chunk(chunk_id)? {
                        chunks.push((chunk_id.chunk_index, data));
                    }
                }
            }
        }

        chunks.sort_by_key(|(index, _)| *index);

        Ok(chunks.into_iter().flat_map(|(_, data)| data).collect())
    }
}
