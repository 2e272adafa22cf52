use std::fs::File;

use zen_asset::container::context::PackageContext;
use zen_asset::container::provider::IoStoreFileProvider;
use zen_asset::convert::to_legacy::rebuild_legacy_package;
use zen_asset::convert::to_zen::build_zen_package;
use zen_asset::convert::ConvertOptions;
use zen_asset::crc::{public_export_hash, script_import_hash};
use zen_asset::error::Error;
use zen_asset::flags::EObjectFlags;
use zen_asset::legacy::asset::LegacyAsset;
use zen_asset::legacy::export::ObjectExport;
use zen_asset::legacy::import::ObjectImport;
use zen_asset::name_map::NameMap;
use zen_asset::script_objects::{ScriptObjectDatabase, ScriptObjectEntry};
use zen_asset::types::fname::{FMappedName, FName};
use zen_asset::types::package_index::PackageIndex;
use zen_asset::types::package_object_index::{EPackageObjectIndexType, PackageObjectIndex};
use zen_asset::version::EIoContainerHeaderVersion;
use zen_asset::zen::exports::EExportCommandType;
use zen_asset::zen::package::ZenPackage;
use zen_asset::zen::package_id::PackageId;

const VERSION: EIoContainerHeaderVersion = EIoContainerHeaderVersion::NoExportInfo;

type NoContext<'a> = Option<&'a PackageContext<File, IoStoreFileProvider>>;

/// Build a legacy asset in memory, the way the legacy reader would produce it
struct AssetBuilder {
    asset: LegacyAsset,
}

impl AssetBuilder {
    fn new(source_path: &str) -> Self {
        let mut asset = LegacyAsset::default();
        asset.source_path = source_path.to_string();
        asset.summary.header_offset = 0x100;

        AssetBuilder { asset }
    }

    fn name(&mut self, value: &str) -> FName {
        FName::new(self.asset.name_map.add_name_reference(value.to_string(), false), 0)
    }

    fn import(
        &mut self,
        class_package: &str,
        class_name: &str,
        outer: PackageIndex,
        object_name: &str,
    ) -> PackageIndex {
        let class_package = self.name(class_package);
        let class_name = self.name(class_name);
        let object_name = self.name(object_name);

        self.asset.imports.push(ObjectImport::new(
            class_package,
            class_name,
            outer,
            object_name,
        ));
        PackageIndex::new(-(self.asset.imports.len() as i32))
    }

    fn export(
        &mut self,
        object_name: &str,
        class_index: PackageIndex,
        outer_index: PackageIndex,
        flags: EObjectFlags,
        data: &[u8],
    ) -> PackageIndex {
        let object_name = self.name(object_name);

        self.asset.exports.push(ObjectExport {
            object_name,
            class_index,
            outer_index,
            object_flags: flags,
            serial_size: data.len() as i64,
            data: data.to_vec(),
            ..Default::default()
        });
        PackageIndex::new(self.asset.exports.len() as i32)
    }

    fn finish(mut self) -> LegacyAsset {
        self.asset.depends_map = vec![Vec::new(); self.asset.exports.len()];
        self.asset
    }
}

fn script_object_database() -> ScriptObjectDatabase {
    let mut name_map = NameMap::new();
    let mut add = |name: &str| name_map.add_name_reference(name.to_string(), false) as u32;

    let core = add("/Script/CoreUObject");
    let object = add("Object");
    let default_object = add("Default__Object");
    let engine = add("/Script/Engine");
    let static_mesh = add("StaticMesh");

    let core_package = ScriptObjectEntry {
        object_name: FMappedName::new(core, 0),
        global_index: PackageObjectIndex::script_import(script_import_hash("/Script/CoreUObject")),
        ..Default::default()
    };
    let object_class = ScriptObjectEntry {
        object_name: FMappedName::new(object, 0),
        global_index: PackageObjectIndex::script_import(script_import_hash(
            "/Script/CoreUObject/Object",
        )),
        outer_index: core_package.global_index,
        ..Default::default()
    };
    let object_cdo = ScriptObjectEntry {
        object_name: FMappedName::new(default_object, 0),
        global_index: PackageObjectIndex::script_import(script_import_hash(
            "/Script/CoreUObject/Default__Object",
        )),
        outer_index: core_package.global_index,
        cdo_class_index: object_class.global_index,
    };
    let engine_package = ScriptObjectEntry {
        object_name: FMappedName::new(engine, 0),
        global_index: PackageObjectIndex::script_import(script_import_hash("/Script/Engine")),
        ..Default::default()
    };
    let static_mesh_class = ScriptObjectEntry {
        object_name: FMappedName::new(static_mesh, 0),
        global_index: PackageObjectIndex::script_import(script_import_hash(
            "/Script/Engine/StaticMesh",
        )),
        outer_index: engine_package.global_index,
        ..Default::default()
    };

    ScriptObjectDatabase::from_parts(
        name_map,
        vec![
            core_package,
            object_class,
            object_cdo,
            engine_package,
            static_mesh_class,
        ],
    )
    .unwrap()
}

/// A single public export of class `/Script/CoreUObject.Object` with a
/// four-byte payload
fn single_export_asset() -> LegacyAsset {
    let mut builder = AssetBuilder::new("../../../Project/Content/X/Asset.uasset");

    let core_package = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/CoreUObject",
    );
    let object_class = builder.import("/Script/CoreUObject", "Class", core_package, "Object");

    builder.export(
        "Asset",
        object_class,
        PackageIndex::null(),
        EObjectFlags::RF_PUBLIC,
        &[0xaa, 0xbb, 0xcc, 0xdd],
    );

    builder.finish()
}

#[test]
fn single_export_package() -> Result<(), Error> {
    let asset = single_export_asset();
    let database = script_object_database();
    let zen = build_zen_package(&asset, VERSION, Some(&database), &ConvertOptions::default())?;

    assert_eq!(zen.package_name()?, "/Game/X/Asset");
    assert_eq!(
        zen.package_id()?,
        PackageId::from_name("/Game/X/Asset")
    );

    // both imports resolve as script imports through the database
    assert_eq!(zen.import_map.len(), 2);
    assert_eq!(
        zen.import_map[0],
        PackageObjectIndex::script_import(script_import_hash("/Script/CoreUObject"))
    );
    assert_eq!(
        zen.import_map[1],
        PackageObjectIndex::script_import(script_import_hash("/Script/CoreUObject/Object"))
    );

    assert_eq!(zen.export_map.len(), 1);
    let export = &zen.export_map[0];
    assert_eq!(export.cooked_serial_offset, 0);
    assert_eq!(export.cooked_serial_size, 4);
    assert_eq!(export.public_export_hash, public_export_hash("Asset"));
    assert_eq!(export.class_index, zen.import_map[1]);

    assert_eq!(zen.payload, vec![0xaa, 0xbb, 0xcc, 0xdd]);

    // the generic schedule of a single export is create, then serialize
    assert_eq!(zen.export_bundle_entries.len(), 2);
    assert_eq!(
        zen.export_bundle_entries[0].command_type,
        EExportCommandType::Create
    );
    assert_eq!(
        zen.export_bundle_entries[1].command_type,
        EExportCommandType::Serialize
    );

    // one dependency bundle header, no entries for a dependency-free export
    assert_eq!(zen.dependency_bundle_headers.len(), 1);
    assert_eq!(zen.dependency_bundle_headers[0].entry_count(), 0);
    assert!(zen.dependency_bundle_entries.is_empty());

    assert!(zen.imported_packages.is_empty());
    assert!(zen.imported_package_names.is_empty());

    zen.validate()?;

    Ok(())
}

#[test]
fn cross_package_reference() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let package_b = builder.import("/Script/CoreUObject", "Package", PackageIndex::null(), "/Game/B");
    let mesh = builder.import("/Script/Engine", "StaticMesh", package_b, "Mesh");

    builder.export(
        "A",
        mesh,
        PackageIndex::null(),
        EObjectFlags::RF_PUBLIC,
        &[0x01],
    );

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    assert_eq!(zen.imported_packages, vec![PackageId::from_name("/Game/B")]);
    assert_eq!(zen.imported_package_names, vec!["/Game/B".to_string()]);
    assert_eq!(
        zen.imported_public_export_hashes,
        vec![public_export_hash("Mesh")]
    );

    // a root package reference encodes as null, the object as a slot pair
    assert_eq!(zen.import_map[0], PackageObjectIndex::null());
    assert_eq!(zen.import_map[1], PackageObjectIndex::package_import(0, 0));

    Ok(())
}

#[test]
fn duplicate_imported_package_reuses_slot() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let package_b = builder.import("/Script/CoreUObject", "Package", PackageIndex::null(), "/Game/B");
    let mesh = builder.import("/Script/Engine", "StaticMesh", package_b, "Mesh");
    let other = builder.import("/Script/Engine", "StaticMesh", package_b, "Other");

    builder.export("A", mesh, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);
    builder.export("B", other, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x02]);

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    assert_eq!(zen.imported_packages.len(), 1);
    assert_eq!(zen.import_map[1], PackageObjectIndex::package_import(0, 0));
    assert_eq!(zen.import_map[2], PackageObjectIndex::package_import(0, 1));

    Ok(())
}

#[test]
fn self_reference_import_is_null() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let own_package = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Game/A",
    );
    let own_object = builder.import("/Script/Engine", "StaticMesh", own_package, "Inner");

    builder.export(
        "A",
        own_object,
        PackageIndex::null(),
        EObjectFlags::RF_PUBLIC,
        &[0x01],
    );

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    assert_eq!(zen.import_map[0], PackageObjectIndex::null());
    assert_eq!(zen.import_map[1], PackageObjectIndex::null());
    assert!(zen.imported_packages.is_empty());

    Ok(())
}

#[test]
fn script_import_falls_back_to_path_hash() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let engine = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/Engine",
    );
    let static_mesh = builder.import("/Script/CoreUObject", "Class", engine, "StaticMesh");

    builder.export(
        "A",
        static_mesh,
        PackageIndex::null(),
        EObjectFlags::RF_PUBLIC,
        &[0x01],
    );

    let asset = builder.finish();

    // no database loaded: the path hash stands in
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    let import = zen.import_map[1];
    assert_eq!(import.ty, EPackageObjectIndexType::ScriptImport);
    assert_eq!(
        import.script_import_id()?,
        script_import_hash("/Script/Engine/StaticMesh")
    );

    Ok(())
}

#[test]
fn strict_mode_rejects_unresolved_script_imports() {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let engine = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/Engine",
    );
    let class = builder.import("/Script/CoreUObject", "Class", engine, "StaticMesh");
    builder.export("A", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);

    let asset = builder.finish();

    let options = ConvertOptions {
        strict: true,
        ..Default::default()
    };
    assert!(matches!(
        build_zen_package(&asset, VERSION, None, &options),
        Err(Error::UnresolvedReference(_))
    ));
}

#[test]
fn anim_blueprint_schedule() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/MyAnimBP.uasset");

    let engine = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/Engine",
    );
    let class = builder.import(
        "/Script/Engine",
        "AnimBlueprintGeneratedClass",
        engine,
        "AnimBlueprintGeneratedClass",
    );

    for name in ["MyAnimBP_C", "Node0", "Node1", "Default__MyAnimBP", "Node2", "Node3"] {
        builder.export(name, class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x00]);
    }

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    let schedule: Vec<(u32, EExportCommandType)> = zen
        .export_bundle_entries
        .iter()
        .map(|e| (e.local_export_index, e.command_type))
        .collect();

    use EExportCommandType::{Create, Serialize};
    assert_eq!(
        schedule,
        vec![
            (0, Create),
            (1, Create),
            (2, Create),
            (4, Create),
            (5, Create),
            (1, Serialize),
            (2, Serialize),
            (4, Serialize),
            (0, Serialize),
            (3, Create),
            (5, Serialize),
            (3, Serialize),
        ]
    );

    zen.validate()?;

    Ok(())
}

#[test]
fn anim_blueprint_with_moved_cdo_takes_generic_schedule() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/MyAnimBP.uasset");

    let engine = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/Engine",
    );
    let class = builder.import(
        "/Script/Engine",
        "AnimBlueprintGeneratedClass",
        engine,
        "AnimBlueprintGeneratedClass",
    );

    // the CDO is not where the fixed schedule expects it
    for name in ["MyAnimBP_C", "Default__MyAnimBP", "Node0", "Node1", "Node2", "Node3"] {
        builder.export(name, class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x00]);
    }

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    use EExportCommandType::{Create, Serialize};
    let schedule: Vec<(u32, EExportCommandType)> = zen
        .export_bundle_entries
        .iter()
        .map(|e| (e.local_export_index, e.command_type))
        .collect();

    assert_eq!(
        schedule,
        vec![
            (0, Create),
            (1, Create),
            (2, Create),
            (3, Create),
            (4, Create),
            (5, Create),
            (0, Serialize),
            (1, Serialize),
            (2, Serialize),
            (3, Serialize),
            (4, Serialize),
            (5, Serialize),
        ]
    );

    Ok(())
}

#[test]
fn preload_dependencies_order_the_schedule() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let core = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/CoreUObject",
    );
    let class = builder.import("/Script/CoreUObject", "Class", core, "Object");

    let first = builder.export("First", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);
    builder.export("Second", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x02]);

    // the first export can only be created after the second one exists
    builder.asset.exports[0].create_before_create_dependencies =
        vec![PackageIndex::from_export(1)?];
    let _ = first;

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    use EExportCommandType::{Create, Serialize};
    let schedule: Vec<(u32, EExportCommandType)> = zen
        .export_bundle_entries
        .iter()
        .map(|e| (e.local_export_index, e.command_type))
        .collect();

    assert_eq!(
        schedule,
        vec![(1, Create), (0, Create), (1, Serialize), (0, Serialize)]
    );

    // dependency bundle entries keep the legacy index encoding
    assert_eq!(zen.dependency_bundle_headers[0].create_before_create, 1);
    assert_eq!(
        zen.dependency_bundle_entries[0],
        PackageIndex::from_export(1)?
    );

    zen.validate()?;

    Ok(())
}

#[test]
fn dependency_cycles_fall_back_to_source_order() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let core = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/CoreUObject",
    );
    let class = builder.import("/Script/CoreUObject", "Class", core, "Object");

    builder.export("First", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);
    builder.export("Second", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x02]);

    builder.asset.exports[0].create_before_create_dependencies =
        vec![PackageIndex::from_export(1)?];
    builder.asset.exports[1].create_before_create_dependencies =
        vec![PackageIndex::from_export(0)?];

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    // the cycle breaks at the smallest export index
    assert_eq!(zen.export_bundle_entries[0].local_export_index, 0);

    zen.validate()?;

    Ok(())
}

#[test]
fn outer_fallback_dependency_entry() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let core = builder.import(
        "/Script/CoreUObject",
        "Package",
        PackageIndex::null(),
        "/Script/CoreUObject",
    );
    let class = builder.import("/Script/CoreUObject", "Class", core, "Object");

    let outer = builder.export("Outer", class, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);
    builder.export("Inner", class, outer, EObjectFlags::RF_NO_FLAGS, &[0x02]);

    let asset = builder.finish();
    let zen = build_zen_package(&asset, VERSION, None, &ConvertOptions::default())?;

    // an export without preload dependencies still waits for its outer
    let header = &zen.dependency_bundle_headers[1];
    assert_eq!(header.create_before_create, 1);
    assert_eq!(
        zen.dependency_bundle_entries[header.first_entry_index as usize],
        PackageIndex::from_export(0)?
    );

    // the nested export hashes its outer chain
    assert_eq!(zen.export_map[0].public_export_hash, public_export_hash("Outer"));
    assert_eq!(zen.export_map[1].public_export_hash, 0);

    zen.validate()?;

    Ok(())
}

#[test]
fn zen_to_legacy_round_trip() -> Result<(), Error> {
    let asset = single_export_asset();
    let database = script_object_database();
    let options = ConvertOptions::default();

    let zen = build_zen_package(&asset, VERSION, Some(&database), &options)?;
    let bytes = zen.write()?;
    let zen = ZenPackage::read(&bytes, VERSION)?;

    let no_context: NoContext = None;
    let rebuilt = rebuild_legacy_package(&zen, no_context, Some(&database), &options)?;

    // payload bytes survive the round trip untouched
    assert_eq!(rebuilt.exports.len(), 1);
    assert_eq!(rebuilt.exports[0].data, vec![0xaa, 0xbb, 0xcc, 0xdd]);
    assert_eq!(
        rebuilt.exports[0]
            .object_name
            .resolve(&rebuilt.name_map)?,
        "Asset"
    );
    assert!(rebuilt.exports[0]
        .object_flags
        .contains(EObjectFlags::RF_PUBLIC));

    // the class import chain rebuilt through the script object database
    let class_index = rebuilt.exports[0].class_index;
    let class_import = &rebuilt.imports[class_index.import_entry().unwrap()];
    assert_eq!(class_import.object_name.resolve(&rebuilt.name_map)?, "Object");
    assert_eq!(class_import.class_name.resolve(&rebuilt.name_map)?, "Class");

    let outer = &rebuilt.imports[class_import.outer_index.import_entry().unwrap()];
    assert_eq!(
        outer.object_name.resolve(&rebuilt.name_map)?,
        "/Script/CoreUObject"
    );
    assert_eq!(outer.class_name.resolve(&rebuilt.name_map)?, "Package");

    // and the rebuilt asset serializes as a valid legacy pair
    let (header, body) = rebuilt.write()?;
    let reparsed = LegacyAsset::read(&header, &body, "A.uasset")?;
    assert_eq!(reparsed.exports[0].data, vec![0xaa, 0xbb, 0xcc, 0xdd]);
    assert_eq!(reparsed.imports.len(), rebuilt.imports.len());

    Ok(())
}

#[test]
fn builder_is_deterministic() -> Result<(), Error> {
    let asset = single_export_asset();
    let database = script_object_database();
    let options = ConvertOptions::default();

    let first = build_zen_package(&asset, VERSION, Some(&database), &options)?.write()?;
    let second = build_zen_package(&asset, VERSION, Some(&database), &options)?.write()?;

    assert_eq!(first, second);

    Ok(())
}

#[test]
fn bulk_side_file_charges_the_last_export() -> Result<(), Error> {
    let asset = single_export_asset();

    let options = ConvertOptions {
        bulk_data_size: Some(0x1000),
        ..Default::default()
    };
    let zen = build_zen_package(&asset, VERSION, None, &options)?;

    assert_eq!(zen.export_map[0].cooked_serial_size, 4 + 432);
    zen.validate()?;

    Ok(())
}

#[test]
fn graph_data_for_old_containers() -> Result<(), Error> {
    let mut builder = AssetBuilder::new("../../../Project/Content/A.uasset");

    let package_b = builder.import("/Script/CoreUObject", "Package", PackageIndex::null(), "/Game/B");
    let mesh = builder.import("/Script/Engine", "StaticMesh", package_b, "Mesh");

    builder.export("A", mesh, PackageIndex::null(), EObjectFlags::RF_PUBLIC, &[0x01]);
    builder.asset.exports[0].serialization_before_serialization_dependencies = vec![mesh];

    let asset = builder.finish();
    let zen = build_zen_package(
        &asset,
        EIoContainerHeaderVersion::OptionalSegmentPackages,
        None,
        &ConvertOptions::default(),
    )?;

    let graph = zen.graph_data.as_ref().expect("graph data");
    assert_eq!(graph.export_bundle_headers.len(), 1);
    assert_eq!(graph.export_bundle_headers[0].entry_count, 2);
    assert_eq!(graph.arcs_from_imported_packages.len(), 1);
    assert_eq!(graph.arcs_from_imported_packages[0].1.len(), 1);

    assert!(zen.dependency_bundle_headers.is_empty());

    // old layouts round trip through their own summary shape
    let bytes = zen.write()?;
    let reparsed = ZenPackage::read_with_store_entry(
        &bytes,
        EIoContainerHeaderVersion::OptionalSegmentPackages,
        1,
        &zen.imported_packages,
    )?;
    assert_eq!(reparsed.graph_data, zen.graph_data);

    Ok(())
}
