//! Zen → Legacy package rebuilder

use std::io::{Read, Seek};

use log::warn;

use crate::container::context::PackageContext;
use crate::container::provider::IoStoreProvider;
use crate::convert::ConvertOptions;
use crate::error::Error;
use crate::flags::{EExportFilterFlags, EPackageFlags};
use crate::legacy::asset::LegacyAsset;
use crate::legacy::export::ObjectExport;
use crate::legacy::import::ObjectImport;
use crate::legacy::summary::{GenerationInfo, LegacySummary};
use crate::name_map::NameMap;
use crate::script_objects::ScriptObjectDatabase;
use crate::types::fname::FName;
use crate::types::package_index::PackageIndex;
use crate::types::package_object_index::{EPackageObjectIndexType, PackageObjectIndex};
use crate::zen::package::ZenPackage;

struct Rebuilder<'a> {
    name_map: NameMap,
    imports: Vec<ObjectImport>,
    script_objects: Option<&'a ScriptObjectDatabase>,
    strict: bool,
}

impl<'a> Rebuilder<'a> {
    fn fname(&mut self, value: &str, number: i32) -> FName {
        let index = self.name_map.add_name_reference(value.to_string(), false);
        FName::new(index, number)
    }

    /// Add an import, reusing an existing identical slot
    fn add_import(&mut self, import: ObjectImport) -> PackageIndex {
        if let Some(existing) = self.imports.iter().position(|e| *e == import) {
            return PackageIndex::new(-(existing as i32) - 1);
        }

        self.imports.push(import);
        PackageIndex::new(-(self.imports.len() as i32))
    }

    fn add_package_import(&mut self, package_path: &str) -> PackageIndex {
        let class_package = self.fname("/Script/CoreUObject", 0);
        let class_name = self.fname("Package", 0);
        let object_name = self.fname(package_path, 0);

        self.add_import(ObjectImport::new(
            class_package,
            class_name,
            PackageIndex::null(),
            object_name,
        ))
    }

    fn add_placeholder(&mut self, hex: u64) -> Result<PackageIndex, Error> {
        if self.strict {
            return Err(Error::unresolved(format!(
                "Unresolved import {hex:#x} in strict mode"
            )));
        }

        warn!("Unresolved import {hex:#x}, rebuilding a placeholder");

        let class_package = self.fname("/Script/CoreUObject", 0);
        let class_name = self.fname("Object", 0);
        let object_name = self.fname(&format!("__UnresolvedImport_{hex:x}__"), 0);

        Ok(self.add_import(ObjectImport::new(
            class_package,
            class_name,
            PackageIndex::null(),
            object_name,
        )))
    }

    /// Materialize a script object and its outer chain as legacy imports
    fn materialize_script_import(
        &mut self,
        index: PackageObjectIndex,
    ) -> Result<PackageIndex, Error> {
        let Some(database) = self.script_objects else {
            return self.add_placeholder(index.id);
        };

        // collect the outer chain, outermost (the script package) first
        let mut chain = Vec::new();
        let mut current = database.by_global_index(index);
        while let Some(entry) = current {
            chain.push(*entry);
            current = match entry.outer_index.is_null() {
                true => None,
                false => database.by_global_index(entry.outer_index),
            };

            if chain.len() > 64 {
                return Err(Error::malformed(format!(
                    "Script object {index} outer chain does not terminate"
                )));
            }
        }
        if chain.is_empty() {
            return self.add_placeholder(index.id);
        }
        chain.reverse();

        let mut outer = PackageIndex::null();
        for (depth, entry) in chain.iter().enumerate() {
            let object_name = entry.object_name.resolve(&database.name_map)?.to_string();

            let import = match depth == 0 {
                // the chain root is the script package itself
                true => {
                    let class_package = self.fname("/Script/CoreUObject", 0);
                    let class_name = self.fname("Package", 0);
                    let object_name = self.fname(&object_name, 0);
                    ObjectImport::new(class_package, class_name, PackageIndex::null(), object_name)
                }
                false => {
                    let class_name = match database.is_class(entry.global_index) {
                        true => self.fname("Class", 0),
                        false => self.fname("Object", 0),
                    };
                    let class_package = self.fname("/Script/CoreUObject", 0);
                    let object_name = self.fname(&object_name, 0);
                    ObjectImport::new(class_package, class_name, outer, object_name)
                }
            };

            outer = self.add_import(import);
        }

        Ok(outer)
    }

    /// Materialize a cross-package reference as legacy imports for the
    /// target package, the target export, and its class
    fn materialize_package_import<R, P>(
        &mut self,
        zen: &ZenPackage,
        import_index: usize,
        context: Option<&PackageContext<R, P>>,
    ) -> Result<PackageIndex, Error>
    where
        R: Read + Seek,
        P: IoStoreProvider<R>,
    {
        let index = zen.import_map[import_index];
        let (package_slot, hash_slot) = index.package_import_slots()?;

        let Some(context) = context else {
            return self.add_placeholder(index.id);
        };

        let resolved = context.resolve_import(zen, import_index);
        let (target, _, entry) = match resolved {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!("Package import {package_slot}/{hash_slot} failed to resolve: {error}");
                return self.add_placeholder(index.id);
            }
        };

        let package_path = match zen.imported_package_names.get(package_slot as usize) {
            Some(name) => name.clone(),
            None => target.package_name()?,
        };
        let package_import = self.add_package_import(&package_path);

        // the class of the target export, usually an engine class
        let (class_package, class_name) = match entry.class_index.ty {
            EPackageObjectIndexType::ScriptImport => match self
                .script_objects
                .and_then(|db| db.by_global_index(entry.class_index))
            {
                Some(class_entry) => {
                    let database = self.script_objects.unwrap();
                    let class_name = class_entry
                        .object_name
                        .resolve(&database.name_map)?
                        .to_string();
                    let class_package = match class_entry.outer_index.is_null() {
                        true => "/Script/CoreUObject".to_string(),
                        false => match database.by_global_index(class_entry.outer_index) {
                            Some(outer) => {
                                outer.object_name.resolve(&database.name_map)?.to_string()
                            }
                            None => "/Script/CoreUObject".to_string(),
                        },
                    };
                    (class_package, class_name)
                }
                None => ("/Script/CoreUObject".to_string(), "Object".to_string()),
            },
            _ => ("/Script/CoreUObject".to_string(), "Object".to_string()),
        };

        let object_name = entry.object_name.resolve(&target.name_map)?.to_string();

        let class_package = self.fname(&class_package, 0);
        let class_name = self.fname(&class_name, 0);
        let object_name = self.fname(&object_name, entry.object_name.number as i32);

        Ok(self.add_import(ObjectImport::new(
            class_package,
            class_name,
            package_import,
            object_name,
        )))
    }
}

/// Rebuild a legacy asset model from a Zen package.
///
/// Package imports resolve through the context; script imports through the
/// database. Unresolvable references become placeholder imports unless
/// `strict`.
pub fn rebuild_legacy_package<R, P>(
    zen: &ZenPackage,
    context: Option<&PackageContext<R, P>>,
    script_objects: Option<&ScriptObjectDatabase>,
    options: &ConvertOptions,
) -> Result<LegacyAsset, Error>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    let mut rebuilder = Rebuilder {
        name_map: NameMap::new(),
        imports: Vec::new(),
        script_objects,
        strict: options.strict,
    };

    // zen name indices must stay valid, so the zen names come first
    for name in zen.name_map.get_name_map_index_list() {
        rebuilder.name_map.add_name_reference(name.clone(), true);
    }

    rebuilder.add_package_import("/Script/CoreUObject");

    // one legacy slot per zen import; Null imports keep a null sentinel so
    // remap positions stay aligned
    let mut legacy_slots = Vec::with_capacity(zen.import_map.len());
    for (import_index, import) in zen.import_map.iter().enumerate() {
        let slot = match import.ty {
            EPackageObjectIndexType::Null => PackageIndex::null(),
            EPackageObjectIndexType::ScriptImport => {
                rebuilder.materialize_script_import(*import)?
            }
            EPackageObjectIndexType::PackageImport => {
                rebuilder.materialize_package_import(zen, import_index, context)?
            }
            EPackageObjectIndexType::Export => {
                return Err(Error::malformed(format!(
                    "Import map entry {import_index} is an export index"
                )))
            }
        };
        legacy_slots.push(slot);
    }

    fn remap(
        rebuilder: &mut Rebuilder,
        zen: &ZenPackage,
        legacy_slots: &[PackageIndex],
        index: PackageObjectIndex,
    ) -> Result<PackageIndex, Error> {
        match index.ty {
            EPackageObjectIndexType::Null => Ok(PackageIndex::null()),
            EPackageObjectIndexType::Export => {
                PackageIndex::from_export(index.export_index()? as i32)
            }
            _ => match zen.import_map.iter().position(|e| *e == index) {
                Some(slot) => Ok(legacy_slots[slot]),
                // an index not present in the import map still resolves if
                // it names a script object
                None => match index.ty {
                    EPackageObjectIndexType::ScriptImport => {
                        rebuilder.materialize_script_import(index)
                    }
                    _ => rebuilder.add_placeholder(index.id),
                },
            },
        }
    }

    let mut exports = Vec::with_capacity(zen.export_map.len());
    for (export_index, entry) in zen.export_map.iter().enumerate() {
        let object_name = FName::new(
            entry.object_name.index as i32,
            entry.object_name.number as i32,
        );

        // the last export's declared size may carry bulk overhead past the
        // payload region
        let start = entry.cooked_serial_offset as usize;
        let end = (start + entry.cooked_serial_size as usize).min(zen.payload.len());
        if start > end {
            return Err(Error::malformed(format!(
                "Export {export_index} payload is out of bounds"
            )));
        }

        let mut export = ObjectExport {
            class_index: remap(&mut rebuilder, zen, &legacy_slots, entry.class_index)?,
            super_index: remap(&mut rebuilder, zen, &legacy_slots, entry.super_index)?,
            template_index: remap(&mut rebuilder, zen, &legacy_slots, entry.template_index)?,
            outer_index: remap(&mut rebuilder, zen, &legacy_slots, entry.outer_index)?,
            object_name,
            object_flags: entry.object_flags,
            serial_size: (end - start) as i64,
            not_for_client: entry.filter_flags == EExportFilterFlags::NotForClient,
            not_for_server: entry.filter_flags == EExportFilterFlags::NotForServer,
            is_asset: entry.outer_index.is_null(),
            generate_public_hash: entry.public_export_hash != 0,
            data: zen.payload[start..end].to_vec(),
            ..Default::default()
        };

        // dependency bundles carry the preload lists in create-before-create
        // first order
        if let Some(header) = zen.dependency_bundle_headers.get(export_index) {
            let mut cursor = header.first_entry_index as usize;
            let mut take = |count: u32| -> Result<Vec<PackageIndex>, Error> {
                let mut list = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let entry = *zen.dependency_bundle_entries.get(cursor).ok_or_else(|| {
                        Error::malformed(format!(
                            "Dependency bundle entry {cursor} is out of range"
                        ))
                    })?;
                    cursor += 1;

                    if let Some(slot) = entry.import_entry() {
                        // entries pointing at imports that rebuilt to null
                        // have nothing to preload
                        if legacy_slots.get(slot).map(|e| e.is_null()).unwrap_or(true) {
                            continue;
                        }
                        list.push(legacy_slots[slot]);
                    } else {
                        list.push(entry);
                    }
                }
                Ok(list)
            };

            export.create_before_create_dependencies = take(header.create_before_create)?;
            export.serialization_before_create_dependencies =
                take(header.serialize_before_create)?;
            export.create_before_serialization_dependencies =
                take(header.create_before_serialize)?;
            export.serialization_before_serialization_dependencies =
                take(header.serialize_before_serialize)?;
        }

        exports.push(export);
    }

    let package_name = zen.package_name()?;

    let mut summary = LegacySummary {
        package_flags: zen.summary.package_flags | EPackageFlags::PKG_FILTER_EDITOR_ONLY,
        unversioned: zen
            .summary
            .package_flags
            .contains(EPackageFlags::PKG_UNVERSIONED_PROPERTIES),
        folder_name: "None".to_string(),
        ..Default::default()
    };
    summary.generations.push(GenerationInfo {
        export_count: exports.len() as i32,
        name_count: rebuilder.name_map.len() as i32,
    });

    let depends_map = vec![Vec::new(); exports.len()];

    Ok(LegacyAsset {
        summary,
        name_map: rebuilder.name_map,
        imports: rebuilder.imports,
        exports,
        depends_map,
        soft_package_references: Vec::new(),
        source_path: package_name,
    })
}
