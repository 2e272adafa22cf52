//! Legacy → Zen package builder

use log::warn;

use crate::convert::payload::{
    rewrite_skeletal_mesh, rewrite_string_table, ExportClassFamily, Rewrite,
};
use crate::convert::{BulkMapPolicy, ConvertOptions};
use crate::crc::{public_export_hash, script_import_hash};
use crate::error::Error;
use crate::flags::{EExportFilterFlags, EObjectFlags, EPackageFlags};
use crate::legacy::asset::LegacyAsset;
use crate::legacy::export::ObjectExport;
use crate::name_map::NameMap;
use crate::script_objects::ScriptObjectDatabase;
use crate::types::fname::FMappedName;
use crate::types::package_index::PackageIndex;
use crate::types::package_object_index::PackageObjectIndex;
use crate::version::EIoContainerHeaderVersion;
use crate::zen::bulk_data::BulkDataMapEntry;
use crate::zen::exports::{
    DependencyBundleHeader, EExportCommandType, ExportBundleEntry, ExportBundleHeader,
    ExportMapEntry,
};
use crate::zen::graph::{FExternalArc, GraphData};
use crate::zen::package::ZenPackage;
use crate::zen::package_id::PackageId;
use crate::zen::summary::ZenSummary;

/// Re-project an on-disk asset path to the canonical `/Game/...` package
/// path.
///
/// Cooked asset paths look like `../../../Project/Content/Sub/Asset.uasset`;
/// `.`/`..` segments collapse, the extension drops, and everything behind
/// the `Content` sentinel mounts under `/Game` (`/Engine` for engine
/// content).
pub fn derive_package_path(source_path: &str) -> String {
    let normalized = source_path.replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut segments: Vec<String> = segments.into_iter().map(|e| e.to_string()).collect();
    if let Some(last) = segments.last_mut() {
        if let Some(dot) = last.rfind('.') {
            last.truncate(dot);
        }
    }

    if let Some(content) = segments.iter().position(|e| e == "Content") {
        let mount = match content > 0 && segments[content - 1] == "Engine" {
            true => "/Engine",
            false => "/Game",
        };
        return format!("{}/{}", mount, segments[content + 1..].join("/"));
    }

    match segments.first().map(|e| e.as_str()) {
        Some("Game") | Some("Engine") => format!("/{}", segments.join("/")),
        _ => format!("/Game/{}", segments.join("/")),
    }
}

/// Render a name-number the way imported-package paths are synthesized:
/// a zero-padded two-digit suffix. Package ids depend on this rendering.
fn package_path_with_number(name: &str, number: i32) -> String {
    match number {
        0 => name.to_string(),
        number => format!("{}_{:02}", name, number),
    }
}

/// Where one legacy import points, seen from the current package
enum ImportTarget {
    Script(PackageObjectIndex),
    Package { package_path: String, object_path: String },
    Own,
    PackageRoot,
}

struct ImportMapBuilder<'a> {
    asset: &'a LegacyAsset,
    package_path: String,
    script_objects: Option<&'a ScriptObjectDatabase>,
    strict: bool,

    import_map: Vec<PackageObjectIndex>,
    imported_packages: Vec<PackageId>,
    imported_package_names: Vec<String>,
    imported_public_export_hashes: Vec<u64>,
}

impl<'a> ImportMapBuilder<'a> {
    fn classify(&self, import_index: usize) -> Result<ImportTarget, Error> {
        // the root of the outer chain names the source package
        let mut root = import_index;
        let mut depth = 0;
        while let Some(outer) = self.asset.imports[root].outer_index.import_entry() {
            root = outer;
            depth += 1;
            if depth > 64 {
                return Err(Error::malformed(format!(
                    "Import {import_index} outer chain does not terminate"
                )));
            }
        }

        let full_path = self.asset.import_object_path(import_index)?;
        if full_path.starts_with("/Script/") {
            return Ok(ImportTarget::Script(self.resolve_script_import(
                import_index,
                &full_path,
            )?));
        }

        if root == import_index {
            return Ok(ImportTarget::PackageRoot);
        }

        let root_import = &self.asset.imports[root];
        let package_path = package_path_with_number(
            root_import.object_name.resolve(&self.asset.name_map)?,
            root_import.object_name.number,
        );

        if package_path.eq_ignore_ascii_case(&self.package_path) {
            return Ok(ImportTarget::Own);
        }

        // path of the object inside its own package
        let mut segments = Vec::new();
        let mut current = import_index;
        while current != root {
            segments.push(
                self.asset.imports[current]
                    .object_name
                    .resolve_with_number(&self.asset.name_map)?,
            );
            current = self.asset.imports[current]
                .outer_index
                .import_entry()
                .unwrap_or(root);
        }
        segments.reverse();

        Ok(ImportTarget::Package {
            package_path,
            object_path: segments.join("/"),
        })
    }

    fn resolve_script_import(
        &self,
        import_index: usize,
        full_path: &str,
    ) -> Result<PackageObjectIndex, Error> {
        if let Some(database) = self.script_objects {
            if let Some(entry) = database.by_full_path(full_path) {
                return Ok(entry.global_index);
            }

            let simple_name = self.asset.imports[import_index]
                .object_name
                .resolve(&self.asset.name_map)?;
            if let Some(entry) = database.by_simple_name(simple_name) {
                return Ok(entry.global_index);
            }
        }

        if self.strict {
            return Err(Error::unresolved(format!(
                "Script import {full_path} is not in the script object database"
            )));
        }

        warn!("Script import {full_path} not found, falling back to the path hash");
        Ok(PackageObjectIndex::script_import(script_import_hash(
            full_path,
        )))
    }

    fn build(mut self) -> Result<Self, Error> {
        for import_index in 0..self.asset.imports.len() {
            let index = match self.classify(import_index)? {
                ImportTarget::Script(index) => index,
                ImportTarget::PackageRoot | ImportTarget::Own => PackageObjectIndex::null(),
                ImportTarget::Package {
                    package_path,
                    object_path,
                } => {
                    let package_id = PackageId::from_name(&package_path);
                    let package_slot = match self
                        .imported_packages
                        .iter()
                        .position(|e| *e == package_id)
                    {
                        Some(slot) => slot,
                        None => {
                            self.imported_packages.push(package_id);
                            self.imported_package_names.push(package_path);
                            self.imported_packages.len() - 1
                        }
                    };

                    let hash = public_export_hash(&object_path);
                    let hash_slot = match self
                        .imported_public_export_hashes
                        .iter()
                        .position(|e| *e == hash)
                    {
                        Some(slot) => slot,
                        None => {
                            self.imported_public_export_hashes.push(hash);
                            self.imported_public_export_hashes.len() - 1
                        }
                    };

                    PackageObjectIndex::package_import(package_slot as u32, hash_slot as u32)
                }
            };

            self.import_map.push(index);
        }

        Ok(self)
    }
}

/// Remap a legacy package index into the Zen object index space
fn remap_index(
    index: PackageIndex,
    import_map: &[PackageObjectIndex],
) -> Result<PackageObjectIndex, Error> {
    if index.is_null() {
        return Ok(PackageObjectIndex::null());
    }

    if let Some(export) = index.export_entry() {
        return Ok(PackageObjectIndex::export(export as u32));
    }

    let slot = index.import_entry().unwrap();
    import_map.get(slot).copied().ok_or_else(|| {
        Error::malformed(format!("Import index {index} is out of the import map"))
    })
}

/// Resolve the simple class name of an export, for class-family dispatch
fn export_class_name<'a>(asset: &'a LegacyAsset, export: &ObjectExport) -> Result<&'a str, Error> {
    if let Some(import) = export.class_index.import_entry() {
        return asset.imports[import].object_name.resolve(&asset.name_map);
    }
    if let Some(class_export) = export.class_index.export_entry() {
        return asset.exports[class_export]
            .object_name
            .resolve(&asset.name_map);
    }
    Ok("")
}

/// Path of an export within its package: its outer chain of other exports
fn export_path_within_package(asset: &LegacyAsset, export_index: usize) -> Result<String, Error> {
    let mut segments = Vec::new();
    let mut current = Some(export_index);
    let mut depth = 0;

    while let Some(index) = current {
        let export = &asset.exports[index];
        segments.push(export.object_name.resolve_with_number(&asset.name_map)?);
        current = export.outer_index.export_entry();

        depth += 1;
        if depth > 64 {
            return Err(Error::malformed(format!(
                "Export {export_index} outer chain does not terminate"
            )));
        }
    }

    segments.reverse();
    Ok(segments.join("/"))
}

/// Topologically sort exports by preload dependencies and outers, breaking
/// ties and cycles deterministically by source order
fn topological_export_order(asset: &LegacyAsset) -> Vec<usize> {
    let count = asset.exports.len();
    let mut edges = vec![Vec::new(); count];
    let mut in_degree = vec![0usize; count];

    let mut add_edge = |edges: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>, from: usize, to: usize| {
        if from != to && !edges[from].contains(&to) {
            edges[from].push(to);
            in_degree[to] += 1;
        }
    };

    for (to, export) in asset.exports.iter().enumerate() {
        for dependency in export
            .serialization_before_serialization_dependencies
            .iter()
            .chain(&export.create_before_serialization_dependencies)
            .chain(&export.serialization_before_create_dependencies)
            .chain(&export.create_before_create_dependencies)
        {
            if let Some(from) = dependency.export_entry() {
                if from < count {
                    add_edge(&mut edges, &mut in_degree, from, to);
                }
            }
        }

        if let Some(outer) = export.outer_index.export_entry() {
            if outer < count {
                add_edge(&mut edges, &mut in_degree, outer, to);
            }
        }
    }

    let mut order = Vec::with_capacity(count);
    let mut placed = vec![false; count];

    while order.len() < count {
        // the smallest ready export keeps the order deterministic; if the
        // graph is cyclic the smallest remaining export breaks the cycle
        let next = (0..count)
            .find(|i| !placed[*i] && in_degree[*i] == 0)
            .or_else(|| (0..count).find(|i| !placed[*i]))
            .unwrap();

        placed[next] = true;
        order.push(next);

        for to in &edges[next] {
            in_degree[*to] = in_degree[*to].saturating_sub(1);
        }
    }

    order
}

/// The fixed AnimBlueprint bundle schedule the loader expects: applies to a
/// six-export package with the CDO at index 3, anything else falls back to
/// the generic topological schedule
fn anim_blueprint_schedule(asset: &LegacyAsset) -> Option<Vec<ExportBundleEntry>> {
    if asset.exports.len() != 6 {
        return None;
    }

    let cdo = asset.exports.iter().position(|e| {
        e.object_name
            .resolve(&asset.name_map)
            .map(|name| name.starts_with("Default__"))
            .unwrap_or(false)
    })?;
    if cdo != 3 {
        return None;
    }

    let create = |index: u32| ExportBundleEntry {
        local_export_index: index,
        command_type: EExportCommandType::Create,
    };
    let serialize = |index: u32| ExportBundleEntry {
        local_export_index: index,
        command_type: EExportCommandType::Serialize,
    };

    Some(vec![
        create(0),
        create(1),
        create(2),
        create(4),
        create(5),
        serialize(1),
        serialize(2),
        serialize(4),
        serialize(0),
        create(3),
        serialize(5),
        serialize(3),
    ])
}

fn build_bundle_entries(asset: &LegacyAsset) -> Vec<ExportBundleEntry> {
    let has_anim_blueprint = asset.exports.iter().any(|export| {
        export_class_name(asset, export)
            .map(|name| ExportClassFamily::from_class_name(name) == ExportClassFamily::AnimBlueprint)
            .unwrap_or(false)
    });

    if has_anim_blueprint {
        if let Some(schedule) = anim_blueprint_schedule(asset) {
            return schedule;
        }
    }

    let order = topological_export_order(asset);

    let mut entries = Vec::with_capacity(order.len() * 2);
    for index in &order {
        entries.push(ExportBundleEntry {
            local_export_index: *index as u32,
            command_type: EExportCommandType::Create,
        });
    }
    for index in &order {
        entries.push(ExportBundleEntry {
            local_export_index: *index as u32,
            command_type: EExportCommandType::Serialize,
        });
    }

    entries
}

/// Apply the class-specific payload rule of an export, returning the
/// adjusted bytes
fn adjust_payload(asset: &LegacyAsset, export_index: usize) -> Result<Vec<u8>, Error> {
    let export = &asset.exports[export_index];
    let family = ExportClassFamily::from_class_name(export_class_name(asset, export)?);

    let rewrite = match family {
        ExportClassFamily::StringTable => rewrite_string_table(&export.data)?,
        ExportClassFamily::SkeletalMesh => rewrite_skeletal_mesh(
            &export.data,
            &asset.name_map,
            asset.imports.len(),
            asset.exports.len(),
            None,
        )?,
        _ => Rewrite::AlreadyPadded,
    };

    Ok(match rewrite {
        Rewrite::AlreadyPadded => export.data.clone(),
        Rewrite::Rewritten(data) => data,
    })
}

fn build_dependency_bundles(
    asset: &LegacyAsset,
) -> (Vec<DependencyBundleHeader>, Vec<PackageIndex>) {
    let mut headers = Vec::with_capacity(asset.exports.len());
    let mut entries = Vec::new();

    for export in &asset.exports {
        let mut header = DependencyBundleHeader {
            first_entry_index: entries.len() as u32,
            create_before_create: export.create_before_create_dependencies.len() as u32,
            serialize_before_create: export.serialization_before_create_dependencies.len() as u32,
            create_before_serialize: export.create_before_serialization_dependencies.len() as u32,
            serialize_before_serialize: export
                .serialization_before_serialization_dependencies
                .len() as u32,
        };

        if header.entry_count() == 0 && export.outer_index.is_export() {
            // the loader still needs the outer constructed first
            header.create_before_create = 1;
            entries.push(export.outer_index);
            headers.push(header);
            continue;
        }

        entries.extend(&export.create_before_create_dependencies);
        entries.extend(&export.serialization_before_create_dependencies);
        entries.extend(&export.create_before_serialization_dependencies);
        entries.extend(&export.serialization_before_serialization_dependencies);
        headers.push(header);
    }

    (headers, entries)
}

/// Graph data for containers predating dependency bundles: one bundle
/// covering the whole schedule, plus arcs from imported packages derived
/// from the import-referencing preload dependencies
fn build_graph_data(
    asset: &LegacyAsset,
    import_map: &[PackageObjectIndex],
    imported_packages: &[PackageId],
    bundle_entry_count: u32,
) -> GraphData {
    let mut arcs: Vec<(PackageId, Vec<FExternalArc>)> = imported_packages
        .iter()
        .map(|id| (*id, Vec::new()))
        .collect();

    let mut add_arc = |import_slot: usize, command: EExportCommandType| {
        let Some(index) = import_map.get(import_slot) else {
            return;
        };
        let Ok((package_slot, _)) = index.package_import_slots() else {
            return;
        };
        let Some((_, list)) = arcs.get_mut(package_slot as usize) else {
            return;
        };

        let arc = FExternalArc {
            from: import_slot as i32,
            from_command_type: command,
            to: 0,
        };
        if !list.contains(&arc) {
            list.push(arc);
        }
    };

    for export in &asset.exports {
        for dependency in &export.serialization_before_serialization_dependencies {
            if let Some(slot) = dependency.import_entry() {
                add_arc(slot, EExportCommandType::Serialize);
            }
        }
        for dependency in &export.create_before_serialization_dependencies {
            if let Some(slot) = dependency.import_entry() {
                add_arc(slot, EExportCommandType::Create);
            }
        }
    }

    GraphData {
        export_bundle_headers: vec![ExportBundleHeader {
            serial_offset: 0,
            first_entry_index: 0,
            entry_count: bundle_entry_count,
        }],
        internal_arcs: Vec::new(),
        arcs_from_imported_packages: arcs,
    }
}

/// Build a Zen package model from a parsed legacy asset.
///
/// `container_version` selects between dependency bundles and graph data;
/// the script object database resolves `/Script/` imports to their
/// precomputed global indices.
pub fn build_zen_package(
    asset: &LegacyAsset,
    container_version: EIoContainerHeaderVersion,
    script_objects: Option<&ScriptObjectDatabase>,
    options: &ConvertOptions,
) -> Result<ZenPackage, Error> {
    let package_path = derive_package_path(&asset.source_path);

    // the zen name table preserves legacy order so payload name references
    // stay valid
    let mut name_map = NameMap::new();
    for name in asset.name_map.get_name_map_index_list() {
        name_map.add_name_reference(name.clone(), true);
    }
    let package_name_index = name_map.add_name_reference(package_path.clone(), false);

    let imports = ImportMapBuilder {
        asset,
        package_path: package_path.clone(),
        script_objects,
        strict: options.strict,
        import_map: Vec::new(),
        imported_packages: Vec::new(),
        imported_package_names: Vec::new(),
        imported_public_export_hashes: Vec::new(),
    }
    .build()?;

    // export map and adjusted payloads
    let mut export_map = Vec::with_capacity(asset.exports.len());
    let mut payload = Vec::new();

    for (export_index, export) in asset.exports.iter().enumerate() {
        let data = adjust_payload(asset, export_index)?;

        // the zen name table preserves legacy order, so the index carries over
        if export.object_name.index < 0 || export.object_name.index >= name_map.len() as i32 {
            return Err(Error::malformed(format!(
                "Export {export_index} name is not in the name table"
            )));
        }
        let object_name = FMappedName::new(
            export.object_name.index as u32,
            export.object_name.number as u32,
        );

        let public = export.object_flags.contains(EObjectFlags::RF_PUBLIC);
        let public_hash = match public {
            true => public_export_hash(&export_path_within_package(asset, export_index)?),
            false => 0,
        };

        export_map.push(ExportMapEntry {
            cooked_serial_offset: payload.len() as u64,
            cooked_serial_size: data.len() as u64,
            object_name,
            outer_index: remap_index(export.outer_index, &imports.import_map)?,
            class_index: remap_index(export.class_index, &imports.import_map)?,
            super_index: remap_index(export.super_index, &imports.import_map)?,
            template_index: remap_index(export.template_index, &imports.import_map)?,
            public_export_hash: public_hash,
            object_flags: export.object_flags,
            filter_flags: EExportFilterFlags::from_legacy(
                export.not_for_client,
                export.not_for_server,
            ),
        });

        payload.extend_from_slice(&data);
    }

    // a bulk side-file charges its fixed overhead to the last export
    if options.bulk_data_size.is_some() {
        if let Some(last) = export_map.last_mut() {
            last.cooked_serial_size += options.bulk_overhead;
        }
    }

    let bulk_data_map = match (options.bulk_data_size, options.bulk_map_policy) {
        (Some(size), BulkMapPolicy::SingleEntryCoveringFile) => vec![BulkDataMapEntry {
            serial_offset: 0,
            dup_serial_offset: 0,
            serial_size: size,
            flags: 0,
            padding: 0,
        }],
        _ => Vec::new(),
    };

    let export_bundle_entries = build_bundle_entries(asset);

    let mut package = ZenPackage {
        container_version,
        name_map,
        bulk_data_map,
        imported_public_export_hashes: imports.imported_public_export_hashes,
        import_map: imports.import_map,
        export_map,
        export_bundle_entries,
        imported_packages: imports.imported_packages,
        payload,
        ..Default::default()
    };

    match container_version >= EIoContainerHeaderVersion::NoExportInfo {
        true => {
            let (headers, entries) = build_dependency_bundles(asset);
            package.dependency_bundle_headers = headers;
            package.dependency_bundle_entries = entries;
            package.imported_package_names = imports.imported_package_names;
        }
        false => {
            package.graph_data = Some(build_graph_data(
                asset,
                &package.import_map,
                &package.imported_packages,
                package.export_bundle_entries.len() as u32,
            ));
        }
    }

    let mut package_flags =
        EPackageFlags::PKG_FILTER_EDITOR_ONLY | EPackageFlags::PKG_COOKED;
    package_flags |= asset.summary.package_flags;
    if asset.summary.unversioned {
        package_flags |= EPackageFlags::PKG_UNVERSIONED_PROPERTIES;
    }

    package.summary = ZenSummary {
        name: FMappedName::new(package_name_index as u32, 0),
        package_flags,
        cooked_header_size: asset.summary.header_offset as u32,
        ..Default::default()
    };

    Ok(package)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_path_derivation() {
        assert_eq!(
            derive_package_path("../../../Project/Content/Sub/Asset.uasset"),
            "/Game/Sub/Asset"
        );
        assert_eq!(
            derive_package_path(r"D:\Cooked\Project\Content\Mesh.uasset"),
            "/Game/Mesh"
        );
        assert_eq!(
            derive_package_path("../../../Engine/Content/BasicShapes/Cube.uasset"),
            "/Engine/BasicShapes/Cube"
        );
        assert_eq!(derive_package_path("Game/Sub/Asset.uasset"), "/Game/Sub/Asset");
        assert_eq!(derive_package_path("Sub/./Asset.uasset"), "/Game/Sub/Asset");
    }

    #[test]
    fn package_path_number_rendering() {
        assert_eq!(package_path_with_number("/Game/A", 0), "/Game/A");
        assert_eq!(package_path_with_number("/Game/A", 1), "/Game/A_01");
        assert_eq!(package_path_with_number("/Game/A", 12), "/Game/A_12");
    }
}
