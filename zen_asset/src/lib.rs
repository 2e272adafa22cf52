#![deny(missing_docs)]
#![allow(non_upper_case_globals)]

//! This crate converts Unreal Engine packages between the legacy
//! (`.uasset`/`.uexp`) representation and the Zen representation stored in
//! IoStore (`.utoc`/`.ucas`) containers.
//!
//! # Examples
//!
//! ## Converting a legacy asset to a Zen package
//!
//! ```no_run
//! use std::fs;
//!
//! use zen_asset::{
//!     convert::{to_zen::build_zen_package, ConvertOptions},
//!     legacy::asset::LegacyAsset,
//!     version::EIoContainerHeaderVersion,
//! };
//!
//! let header = fs::read("Mesh.uasset").unwrap();
//! let body = fs::read("Mesh.uexp").unwrap();
//!
//! let asset = LegacyAsset::read(&header, &body, "Game/Content/Mesh").unwrap();
//! let zen = build_zen_package(
//!     &asset,
//!     EIoContainerHeaderVersion::NoExportInfo,
//!     None,
//!     &ConvertOptions::default(),
//! )
//! .unwrap();
//!
//! fs::write("Mesh.uzenasset", zen.write().unwrap()).unwrap();
//! ```

pub mod container;
pub mod convert;
pub mod crc;
pub mod error;
pub mod flags;
pub mod legacy;
pub mod name_map;
pub mod script_objects;
pub mod types;
pub mod usmap;
pub mod version;
pub mod zen;

pub use error::Error;
pub use name_map::NameMap;
pub use types::package_index::PackageIndex;
pub use types::package_object_index::PackageObjectIndex;
