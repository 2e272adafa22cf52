use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Parser, Subcommand};
use log::{error, info, warn, Level, LevelFilter, Metadata, Record};

use zen_asset::container::context::{Container, PackageContext};
use zen_asset::container::provider::IoStoreFileProvider;
use zen_asset::container::reader::IoStoreReader;
use zen_asset::container::toc::IoStoreTocResource;
use zen_asset::convert::to_legacy::rebuild_legacy_package;
use zen_asset::convert::to_zen::build_zen_package;
use zen_asset::convert::ConvertOptions;
use zen_asset::legacy::asset::LegacyAsset;
use zen_asset::usmap::UsmapCache;
use zen_asset::version::EIoContainerHeaderVersion;
use zen_asset::zen::package::ZenPackage;
use zen_asset::zen::package_id::PackageId;

mod inspect;

/// Command line tool for converting Unreal Engine packages between the
/// legacy and Zen (IoStore) formats.
/// Use `zen_asset_cli <SUBCOMMAND> -h` for more information on a subcommand.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Args {
    /// What to do
    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a legacy .uasset/.uexp pair to a Zen package.
    ToZen {
        /// The .uasset file to convert
        asset_path: String,
        /// External schema file for unversioned assets
        #[clap(long)]
        usmap: Option<String>,
        /// Emit the layout of an older container header version
        #[clap(long, default_value_t = 3)]
        container_version: u32,
    },

    /// Extract packages from an IoStore container tree as legacy pairs.
    FromIostoreLegacy {
        /// Directory containing .utoc/.ucas files
        paks_dir: String,
        /// Directory to write .uasset/.uexp pairs to
        output_dir: String,
        /// Only extract packages whose path contains this substring
        #[clap(long)]
        filter: Option<String>,
        /// Also extract every package the filtered set imports
        #[clap(long)]
        with_deps: bool,
    },

    /// Print a human-readable dump of a Zen package.
    InspectZen {
        /// The Zen package file to dump
        zen_path: String,
        /// Container header version the package was written for
        #[clap(long, default_value_t = 3)]
        container_version: u32,
    },
}

#[derive(Debug)]
struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SimpleLogger = SimpleLogger;

fn main() {
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Info));

    let args = Args::parse();

    let result = match args.commands {
        Commands::ToZen {
            asset_path,
            usmap,
            container_version,
        } => to_zen(&asset_path, usmap.as_deref(), container_version),
        Commands::FromIostoreLegacy {
            paks_dir,
            output_dir,
            filter,
            with_deps,
        } => from_iostore_legacy(&paks_dir, &output_dir, filter.as_deref(), with_deps),
        Commands::InspectZen {
            zen_path,
            container_version,
        } => inspect_zen(&zen_path, container_version),
    };

    if let Err(e) = result {
        error!("{e}");
        exit(1);
    }
}

fn container_version_from(raw: u32) -> Result<EIoContainerHeaderVersion, String> {
    EIoContainerHeaderVersion::try_from(raw)
        .map_err(|_| format!("Unknown container header version {raw}"))
}

fn to_zen(asset_path: &str, usmap: Option<&str>, container_version: u32) -> Result<(), String> {
    let container_version = container_version_from(container_version)?;

    let asset_path = Path::new(asset_path);
    let header = fs::read(asset_path).map_err(|e| format!("{}: {e}", asset_path.display()))?;

    let body_path = asset_path.with_extension("uexp");
    let body = fs::read(&body_path).map_err(|e| format!("{}: {e}", body_path.display()))?;

    let mut options = ConvertOptions::default();

    let bulk_path = asset_path.with_extension("ubulk");
    if let Ok(metadata) = fs::metadata(&bulk_path) {
        options.bulk_data_size = Some(metadata.len());
    }

    if let Some(usmap) = usmap {
        let cache = UsmapCache::new();
        match cache.get(Path::new(usmap)) {
            Ok(names) => info!("Loaded {} schema names from {usmap}", names.names.len()),
            Err(e) => warn!("Failed to load {usmap}: {e}"),
        }
    }

    let asset = LegacyAsset::read(&header, &body, &asset_path.to_string_lossy())
        .map_err(|e| format!("{}: {e}", asset_path.display()))?;

    let zen = build_zen_package(&asset, container_version, None, &options)
        .map_err(|e| format!("{}: {e}", asset_path.display()))?;

    let out_path = asset_path.with_extension("uzenasset");
    let bytes = zen.write().map_err(|e| e.to_string())?;
    fs::write(&out_path, bytes).map_err(|e| format!("{}: {e}", out_path.display()))?;

    info!("Wrote {}", out_path.display());
    Ok(())
}

fn load_context(
    paks_dir: &str,
) -> Result<PackageContext<fs::File, IoStoreFileProvider>, String> {
    let mut context = PackageContext::new();
    let mut loaded = 0;

    for entry in walkdir::WalkDir::new(paks_dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.path().extension().map(|e| e == "utoc").unwrap_or(false) {
            let stem = entry
                .path()
                .file_stem()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            let folder = entry
                .path()
                .parent()
                .map(|e| e.to_path_buf())
                .unwrap_or_default();

            let mut toc_file = fs::File::open(entry.path())
                .map_err(|e| format!("{}: {e}", entry.path().display()))?;
            let toc = IoStoreTocResource::read(&mut toc_file, None)
                .map_err(|e| format!("{}: {e}", entry.path().display()))?;

            let provider = IoStoreFileProvider::new(folder);
            let reader = IoStoreReader::new(provider, &stem, toc, None)
                .map_err(|e| format!("{}: {e}", entry.path().display()))?;
            let container =
                Container::new(reader).map_err(|e| format!("{}: {e}", entry.path().display()))?;

            context.load(container, false);
            loaded += 1;
        }
    }

    if loaded == 0 {
        return Err(format!("No .utoc files found under {paks_dir}"));
    }

    info!("Loaded {loaded} containers");
    Ok(context)
}

fn from_iostore_legacy(
    paks_dir: &str,
    output_dir: &str,
    filter: Option<&str>,
    with_deps: bool,
) -> Result<(), String> {
    let context = load_context(paks_dir)?;
    let script_objects = context.script_objects();
    let options = ConvertOptions::default();

    let mut queue: Vec<PackageId> = context
        .package_ids()
        .into_iter()
        .filter(|id| match filter {
            Some(filter) => context
                .package_path(*id)
                .map(|path| path.contains(filter))
                .unwrap_or(false),
            None => true,
        })
        .collect();

    let mut seen: HashSet<PackageId> = queue.iter().copied().collect();
    let mut extracted = 0usize;
    let mut failed = 0usize;

    while let Some(package_id) = queue.pop() {
        let result = extract_package(
            &context,
            script_objects.as_deref(),
            package_id,
            output_dir,
            &options,
        );

        match result {
            Ok(imported) => {
                extracted += 1;
                if with_deps {
                    for dependency in imported {
                        if seen.insert(dependency) {
                            queue.push(dependency);
                        }
                    }
                }
            }
            Err(e) => {
                // a bad package shouldn't sink the whole batch
                warn!("Failed to extract {:#x}: {e}", package_id.id);
                failed += 1;
            }
        }
    }

    info!("Extracted {extracted} packages, {failed} failed");
    Ok(())
}

fn extract_package(
    context: &PackageContext<fs::File, IoStoreFileProvider>,
    script_objects: Option<&zen_asset::script_objects::ScriptObjectDatabase>,
    package_id: PackageId,
    output_dir: &str,
    options: &ConvertOptions,
) -> Result<Vec<PackageId>, String> {
    let zen = context.get(package_id).map_err(|e| e.to_string())?;

    let asset = rebuild_legacy_package(&zen, Some(context), script_objects, options)
        .map_err(|e| e.to_string())?;

    let (header, body) = asset.write().map_err(|e| e.to_string())?;

    let package_path = zen.package_name().map_err(|e| e.to_string())?;
    let relative = package_path.trim_start_matches('/');

    let mut out_path = PathBuf::from(output_dir);
    out_path.push(relative);
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    fs::write(out_path.with_extension("uasset"), header).map_err(|e| e.to_string())?;
    fs::write(out_path.with_extension("uexp"), body).map_err(|e| e.to_string())?;

    let bulk = context.read_bulk(package_id).map_err(|e| e.to_string())?;
    if !bulk.is_empty() {
        fs::write(out_path.with_extension("ubulk"), bulk).map_err(|e| e.to_string())?;
    }

    Ok(zen.imported_packages.clone())
}

fn inspect_zen(zen_path: &str, container_version: u32) -> Result<(), String> {
    let container_version = container_version_from(container_version)?;

    let data = fs::read(zen_path).map_err(|e| format!("{zen_path}: {e}"))?;
    let package =
        ZenPackage::read(&data, container_version).map_err(|e| format!("{zen_path}: {e}"))?;

    inspect::dump(&package).map_err(|e| e.to_string())
}
