//! Human-readable Zen package dump

use zen_asset::error::Error;
use zen_asset::types::package_object_index::EPackageObjectIndexType;
use zen_asset::zen::package::ZenPackage;

pub fn dump(package: &ZenPackage) -> Result<(), Error> {
    println!("Package: {}", package.package_name()?);
    println!("  package id:         {:#018x}", package.package_id()?.id);
    println!("  container version:  {:?}", package.container_version);
    println!("  package flags:      {:?}", package.summary.package_flags);
    println!("  cooked header size: {}", package.summary.cooked_header_size);
    println!("  payload bytes:      {}", package.payload.len());

    println!("Names ({}):", package.name_map.len());
    for (i, name) in package.name_map.get_name_map_index_list().iter().enumerate() {
        println!("  [{i}] {name}");
    }

    println!("Imported packages ({}):", package.imported_packages.len());
    for (i, id) in package.imported_packages.iter().enumerate() {
        match package.imported_package_names.get(i) {
            Some(name) => println!("  [{i}] {:#018x} {name}", id.id),
            None => println!("  [{i}] {:#018x}", id.id),
        }
    }

    println!(
        "Imported public export hashes ({}):",
        package.imported_public_export_hashes.len()
    );
    for (i, hash) in package.imported_public_export_hashes.iter().enumerate() {
        println!("  [{i}] {hash:#018x}");
    }

    println!("Imports ({}):", package.import_map.len());
    for (i, import) in package.import_map.iter().enumerate() {
        match import.ty {
            EPackageObjectIndexType::PackageImport => {
                let (package_slot, hash_slot) = import.package_import_slots()?;
                println!("  [{i}] PackageImport(package {package_slot}, hash {hash_slot})");
            }
            _ => println!("  [{i}] {import}"),
        }
    }

    println!("Exports ({}):", package.export_map.len());
    for (i, export) in package.export_map.iter().enumerate() {
        let name = export.object_name.resolve(&package.name_map)?;
        println!(
            "  [{i}] {name} offset {} size {} class {} outer {} public {:#x} {:?}",
            export.cooked_serial_offset,
            export.cooked_serial_size,
            export.class_index,
            export.outer_index,
            export.public_export_hash,
            export.filter_flags,
        );
    }

    println!("Export bundle entries ({}):", package.export_bundle_entries.len());
    for entry in &package.export_bundle_entries {
        println!(
            "  {:?} {}",
            entry.command_type, entry.local_export_index
        );
    }

    if !package.dependency_bundle_headers.is_empty() {
        println!(
            "Dependency bundles ({} headers, {} entries):",
            package.dependency_bundle_headers.len(),
            package.dependency_bundle_entries.len()
        );
        for (i, header) in package.dependency_bundle_headers.iter().enumerate() {
            println!(
                "  [{i}] first {} cc {} sc {} cs {} ss {}",
                header.first_entry_index,
                header.create_before_create,
                header.serialize_before_create,
                header.create_before_serialize,
                header.serialize_before_serialize,
            );
        }
    }

    if let Some(ref graph) = package.graph_data {
        println!(
            "Graph data: {} bundles, {} internal arcs, {} imported-package arc lists",
            graph.export_bundle_headers.len(),
            graph.internal_arcs.len(),
            graph.arcs_from_imported_packages.len()
        );
    }

    Ok(())
}
