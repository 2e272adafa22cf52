use zen_asset::convert::to_zen::build_zen_package;
use zen_asset::convert::ConvertOptions;
use zen_asset::error::Error;
use zen_asset::flags::EObjectFlags;
use zen_asset::legacy::asset::LegacyAsset;
use zen_asset::legacy::export::ObjectExport;
use zen_asset::legacy::import::ObjectImport;
use zen_asset::types::fname::FName;
use zen_asset::types::package_index::PackageIndex;
use zen_asset::version::EIoContainerHeaderVersion;
use zen_asset::zen::package::ZenPackage;

fn sample_asset() -> LegacyAsset {
    let mut asset = LegacyAsset::default();
    asset.source_path = "../../../Project/Content/Sample.uasset".to_string();

    let mut name = |value: &str| {
        FName::new(
            asset.name_map.add_name_reference(value.to_string(), false),
            0,
        )
    };

    let core_package_name = name("/Script/CoreUObject");
    let package_class = name("Package");
    let class_class = name("Class");
    let object_name = name("Object");
    let outer_name = name("Outer");
    let inner_name = name("Inner");

    asset.imports = vec![
        ObjectImport::new(
            core_package_name,
            package_class,
            PackageIndex::null(),
            core_package_name,
        ),
        ObjectImport::new(
            core_package_name,
            class_class,
            PackageIndex::new(-1),
            object_name,
        ),
    ];

    asset.exports = vec![
        ObjectExport {
            object_name: outer_name,
            class_index: PackageIndex::new(-2),
            object_flags: EObjectFlags::RF_PUBLIC | EObjectFlags::RF_STANDALONE,
            serial_size: 3,
            data: vec![0x01, 0x02, 0x03],
            ..Default::default()
        },
        ObjectExport {
            object_name: inner_name,
            class_index: PackageIndex::new(-2),
            outer_index: PackageIndex::new(1),
            object_flags: EObjectFlags::RF_NO_FLAGS,
            serial_size: 2,
            data: vec![0x04, 0x05],
            create_before_create_dependencies: vec![PackageIndex::new(1)],
            serialization_before_serialization_dependencies: vec![PackageIndex::new(-2)],
            ..Default::default()
        },
    ];

    asset.depends_map = vec![Vec::new(), Vec::new()];
    asset
}

#[test]
fn legacy_write_read_preserves_the_model() -> Result<(), Error> {
    let asset = sample_asset();
    asset.validate()?;

    let (header, body) = asset.write()?;
    let reparsed = LegacyAsset::read(&header, &body, &asset.source_path)?;

    assert_eq!(
        reparsed.name_map.get_name_map_index_list(),
        asset.name_map.get_name_map_index_list()
    );
    assert_eq!(reparsed.imports, asset.imports);
    assert_eq!(reparsed.depends_map, asset.depends_map);

    assert_eq!(reparsed.exports.len(), asset.exports.len());
    for (reparsed_export, export) in reparsed.exports.iter().zip(&asset.exports) {
        assert_eq!(reparsed_export.object_name, export.object_name);
        assert_eq!(reparsed_export.class_index, export.class_index);
        assert_eq!(reparsed_export.outer_index, export.outer_index);
        assert_eq!(reparsed_export.object_flags, export.object_flags);
        assert_eq!(reparsed_export.data, export.data);
        assert_eq!(
            reparsed_export.create_before_create_dependencies,
            export.create_before_create_dependencies
        );
        assert_eq!(
            reparsed_export.serialization_before_serialization_dependencies,
            export.serialization_before_serialization_dependencies
        );
    }

    // the body stream ends with the package file tag
    assert_eq!(&body[body.len() - 4..], &[0xc1, 0x83, 0x2a, 0x9e]);

    Ok(())
}

#[test]
fn legacy_write_is_idempotent() -> Result<(), Error> {
    let asset = sample_asset();

    let (header, body) = asset.write()?;
    let reparsed = LegacyAsset::read(&header, &body, &asset.source_path)?;
    let (header_again, body_again) = reparsed.write()?;

    assert_eq!(header, header_again);
    assert_eq!(body, body_again);

    Ok(())
}

#[test]
fn zen_read_write_read_is_stable() -> Result<(), Error> {
    let asset = sample_asset();
    let zen = build_zen_package(
        &asset,
        EIoContainerHeaderVersion::NoExportInfo,
        None,
        &ConvertOptions::default(),
    )?;

    let bytes = zen.write()?;
    let first_read = ZenPackage::read(&bytes, EIoContainerHeaderVersion::NoExportInfo)?;

    let bytes_again = first_read.write()?;
    let second_read = ZenPackage::read(&bytes_again, EIoContainerHeaderVersion::NoExportInfo)?;

    assert_eq!(bytes, bytes_again);
    assert_eq!(second_read, first_read);

    first_read.validate()?;

    Ok(())
}

#[test]
fn zen_header_tables_are_contiguous() -> Result<(), Error> {
    let asset = sample_asset();
    let zen = build_zen_package(
        &asset,
        EIoContainerHeaderVersion::NoExportInfo,
        None,
        &ConvertOptions::default(),
    )?;

    let bytes = zen.write()?;
    let package = ZenPackage::read(&bytes, EIoContainerHeaderVersion::NoExportInfo)?;
    let summary = &package.summary;

    assert!(summary.imported_public_export_hashes_offset <= summary.import_map_offset);
    assert_eq!(
        (summary.export_map_offset - summary.import_map_offset) % 8,
        0
    );
    assert_eq!(
        (summary.export_bundle_entries_offset - summary.export_map_offset) % 72,
        0
    );
    assert_eq!(
        summary.header_size as usize,
        bytes.len() - package.payload.len()
    );

    // cooked offsets are the running sum of sizes
    let mut offset = 0;
    for export in &package.export_map {
        assert_eq!(export.cooked_serial_offset, offset);
        offset += export.cooked_serial_size;
    }

    Ok(())
}

#[test]
fn truncated_zen_package_is_rejected() {
    let asset = sample_asset();
    let zen = build_zen_package(
        &asset,
        EIoContainerHeaderVersion::NoExportInfo,
        None,
        &ConvertOptions::default(),
    )
    .unwrap();

    let bytes = zen.write().unwrap();

    // cutting the stream inside the tables must not parse
    assert!(ZenPackage::read(&bytes[..40], EIoContainerHeaderVersion::NoExportInfo).is_err());
}
