//! Engine-provided script object directory
//!
//! Loaded once from a container's `ScriptObjects` chunk and queried while
//! converting in either direction. Immutable after load.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::crc;
use crate::error::Error;
use crate::name_map::{read_name_batch, write_name_batch, NameMap};
use crate::types::fname::FMappedName;
use crate::types::package_object_index::PackageObjectIndex;

/// Script object entry, a fixed 32 bytes on disk
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ScriptObjectEntry {
    /// Object name
    pub object_name: FMappedName,
    /// Global index
    pub global_index: PackageObjectIndex,
    /// Outer index
    pub outer_index: PackageObjectIndex,
    /// Class default object index
    pub cdo_class_index: PackageObjectIndex,
}

impl ScriptObjectEntry {
    /// Read a `ScriptObjectEntry` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let object_name = FMappedName::read(reader)?;
        let global_index = PackageObjectIndex::read(reader)?;
        let outer_index = PackageObjectIndex::read(reader)?;
        let cdo_class_index = PackageObjectIndex::read(reader)?;

        Ok(ScriptObjectEntry {
            object_name,
            global_index,
            outer_index,
            cdo_class_index,
        })
    }

    /// Write a `ScriptObjectEntry` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        self.object_name.write(writer)?;
        self.global_index.write(writer)?;
        self.outer_index.write(writer)?;
        self.cdo_class_index.write(writer)?;

        Ok(())
    }
}

/// Name-keyed directory of engine-provided objects with precomputed global
/// indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptObjectDatabase {
    /// Global name map
    pub name_map: NameMap,
    /// Script object entries
    pub entries: Vec<ScriptObjectEntry>,

    by_global: HashMap<u64, usize>,
    by_full_path: HashMap<String, usize>,
    by_simple_name: HashMap<String, Vec<usize>>,
    class_ids: HashSet<u64>,
}

impl ScriptObjectDatabase {
    /// Deserialize the database from a `ScriptObjects` chunk blob:
    /// a name batch followed by a count-prefixed entry array
    pub fn read(data: &[u8]) -> Result<Self, Error> {
        let mut reader = Cursor::new(data);

        let name_map = NameMap::from_name_batch(&read_name_batch(&mut reader)?);

        let entry_count = reader.read_i32::<LE>()?;
        let mut entries = Vec::with_capacity(entry_count.max(0) as usize);
        for _ in 0..entry_count {
            entries.push(ScriptObjectEntry::read(&mut reader)?);
        }

        Self::from_parts(name_map, entries)
    }

    /// Build the database from an already-parsed name map and entry list
    pub fn from_parts(
        name_map: NameMap,
        entries: Vec<ScriptObjectEntry>,
    ) -> Result<Self, Error> {
        let mut database = ScriptObjectDatabase {
            name_map,
            entries,
            ..Default::default()
        };

        for (i, entry) in database.entries.iter().enumerate() {
            database.by_global.insert(entry.global_index.id, i);

            if !entry.cdo_class_index.is_null() {
                database.class_ids.insert(entry.cdo_class_index.id);
            }
        }

        for i in 0..database.entries.len() {
            let path = database.entry_full_path(i)?;
            database
                .by_full_path
                .insert(crc::to_lower_string(&path), i);

            let simple = crc::to_lower_string(
                database.entries[i].object_name.resolve(&database.name_map)?,
            );
            database.by_simple_name.entry(simple).or_default().push(i);
        }

        Ok(database)
    }

    /// Serialize the database back into a `ScriptObjects` blob
    pub fn write(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Cursor::new(Vec::new());

        write_name_batch(&mut writer, self.name_map.get_name_map_index_list())?;

        writer.write_i32::<LE>(self.entries.len() as i32)?;
        for entry in &self.entries {
            entry.write(&mut writer)?;
        }

        Ok(writer.into_inner())
    }

    /// Resolve the full `/Script/...` path of an entry by walking its outers
    pub fn entry_full_path(&self, index: usize) -> Result<String, Error> {
        let mut segments = Vec::new();
        let mut current = Some(index);
        let mut guard = 0;

        while let Some(i) = current {
            let entry = self.entries.get(i).ok_or_else(|| {
                Error::malformed(format!("Script object entry {i} is out of range"))
            })?;

            segments.push(entry.object_name.resolve(&self.name_map)?.to_string());

            current = match entry.outer_index.is_null() {
                true => None,
                false => self.by_global.get(&entry.outer_index.id).copied(),
            };

            guard += 1;
            if guard > 64 {
                return Err(Error::malformed(format!(
                    "Script object outer chain of entry {index} does not terminate"
                )));
            }
        }

        segments.reverse();
        Ok(segments.join("/"))
    }

    /// Look an entry up by its global index
    pub fn by_global_index(&self, index: PackageObjectIndex) -> Option<&ScriptObjectEntry> {
        self.by_global.get(&index.id).map(|i| &self.entries[*i])
    }

    /// Look an entry up by full object path, case-insensitively.
    ///
    /// `:` and `.` subobject separators are folded to `/` first, matching
    /// the script-import hash normalization.
    pub fn by_full_path(&self, path: &str) -> Option<&ScriptObjectEntry> {
        let normalized = crc::to_lower_string(&path.replace([':', '.'], "/"));
        self.by_full_path.get(&normalized).map(|i| &self.entries[*i])
    }

    /// Look an entry up by simple object name; ambiguity resolves to the
    /// first entry in directory order
    pub fn by_simple_name(&self, name: &str) -> Option<&ScriptObjectEntry> {
        self.by_simple_name
            .get(&crc::to_lower_string(name))
            .and_then(|list| list.first())
            .map(|i| &self.entries[*i])
    }

    /// Whether this index names a class (it appears as some CDO's class)
    pub fn is_class(&self, index: PackageObjectIndex) -> bool {
        self.class_ids.contains(&index.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::script_import_hash;

    fn test_database() -> ScriptObjectDatabase {
        let mut name_map = NameMap::new();
        let script_engine = name_map.add_name_reference("/Script/Engine".to_string(), false);
        let static_mesh = name_map.add_name_reference("StaticMesh".to_string(), false);
        let default_mesh = name_map.add_name_reference("Default__StaticMesh".to_string(), false);

        let package = ScriptObjectEntry {
            object_name: FMappedName::new(script_engine as u32, 0),
            global_index: PackageObjectIndex::script_import(script_import_hash("/Script/Engine")),
            outer_index: PackageObjectIndex::null(),
            cdo_class_index: PackageObjectIndex::null(),
        };
        let class = ScriptObjectEntry {
            object_name: FMappedName::new(static_mesh as u32, 0),
            global_index: PackageObjectIndex::script_import(script_import_hash(
                "/Script/Engine/StaticMesh",
            )),
            outer_index: package.global_index,
            cdo_class_index: PackageObjectIndex::null(),
        };
        let cdo = ScriptObjectEntry {
            object_name: FMappedName::new(default_mesh as u32, 0),
            global_index: PackageObjectIndex::script_import(script_import_hash(
                "/Script/Engine/Default__StaticMesh",
            )),
            outer_index: package.global_index,
            cdo_class_index: class.global_index,
        };

        ScriptObjectDatabase::from_parts(name_map, vec![package, class, cdo]).unwrap()
    }

    #[test]
    fn roundtrip() {
        let database = test_database();
        let reparsed = ScriptObjectDatabase::read(&database.write().unwrap()).unwrap();
        assert_eq!(reparsed, database);
    }

    #[test]
    fn lookups() {
        let database = test_database();

        let class = database.by_full_path("/Script/Engine.StaticMesh").unwrap();
        assert_eq!(
            class.global_index,
            PackageObjectIndex::script_import(script_import_hash("/Script/Engine/StaticMesh"))
        );
        assert_eq!(
            database.by_simple_name("staticmesh").unwrap().global_index,
            class.global_index
        );
        assert!(database.by_full_path("/Script/Engine.SkeletalMesh").is_none());

        assert!(database.is_class(class.global_index));
        assert!(!database.is_class(database.by_simple_name("Default__StaticMesh").unwrap().global_index));
    }

    #[test]
    fn full_path_walks_outers() {
        let database = test_database();
        assert_eq!(
            database.entry_full_path(1).unwrap(),
            "/Script/Engine/StaticMesh"
        );
    }
}
