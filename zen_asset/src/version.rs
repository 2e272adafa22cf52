//! Format versions the codec gates on

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// IoStore container header version
///
/// Gates the Zen summary layout: `NoExportInfo` and later use dependency
/// bundles, earlier versions carry graph data instead.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u32)]
pub enum EIoContainerHeaderVersion {
    /// Initial version
    Initial = 0,
    /// Localized packages added
    LocalizedPackages = 1,
    /// Optional segment packages added
    OptionalSegmentPackages = 2,
    /// Export info moved out of the container header into dependency bundles
    NoExportInfo = 3,
    /// Soft package references added
    SoftPackageReferences = 4,
}

/// UE4 object version gates used by the legacy summary
///
/// Summaries record versions this enum doesn't name, so the summary keeps the
/// raw `i32` and compares against these values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ObjectVersion {
    /// Unversioned asset
    UNKNOWN = 0,
    /// Text gatherable data added to the summary
    VER_UE4_SERIALIZE_TEXT_IN_PACKAGES = 459,
    /// Soft package reference map added to the summary
    VER_UE4_ADD_STRING_ASSET_REFERENCES_MAP = 466,
    /// Preload dependencies serialized in cooked exports
    VER_UE4_PRELOAD_DEPENDENCIES_IN_COOKED_EXPORTS = 507,
    /// Searchable names offset added
    VER_UE4_ADDED_SEARCHABLE_NAMES = 510,
    /// Export map serial sizes widened to 64 bits
    VER_UE4_64BIT_EXPORTMAP_SERIALSIZES = 511,
    /// World level info offset added
    VER_UE4_WORLD_LEVEL_INFO = 518,
    /// Newest UE4 object version
    VER_UE4_AUTOMATIC_VERSION = 522,
}

/// UE5 object version gates used by the codec
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ObjectVersionUE5 {
    /// Unversioned asset
    UNKNOWN = 0,
    /// Initial UE5 version
    INITIAL_VERSION = 1000,
    /// Names referenced from export data tracked separately
    NAMES_REFERENCED_FROM_EXPORT_DATA = 1001,
    /// Payload table of contents added to the summary
    PAYLOAD_TOC = 1002,
    /// Optional resource import flag added
    OPTIONAL_RESOURCES = 1003,
    /// Package GUID removed from object exports
    REMOVE_OBJECT_EXPORT_PACKAGE_GUID = 1005,
    /// Inherited-instance flag added to object exports
    TRACK_OBJECT_EXPORT_IS_INHERITED = 1006,
    /// Soft object path list added to the summary
    ADD_SOFTOBJECTPATH_LIST = 1008,
    /// Data resource table added
    DATA_RESOURCES = 1009,
}

/// Legacy file version tag band the reader accepts
///
/// `-8` carries a UE5 object version field, `-7` does not; anything outside
/// the band fails with `UnsupportedVersion`.
pub const SUPPORTED_LEGACY_FILE_VERSIONS: std::ops::RangeInclusive<i32> = -8..=-7;
