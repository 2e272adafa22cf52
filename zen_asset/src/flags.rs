//! Package and object flags

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

bitflags! {
    /// Object instance flags
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EObjectFlags : u32
    {
        /// No flags
        const RF_NO_FLAGS = 0x00000000;
        /// Public, addressable from other packages
        const RF_PUBLIC = 0x00000001;
        /// Standalone
        const RF_STANDALONE = 0x00000002;
        /// Mark as native
        const RF_MARK_AS_NATIVE = 0x00000004;
        /// Transactional
        const RF_TRANSACTIONAL = 0x00000008;
        /// Class Default Object
        const RF_CLASS_DEFAULT_OBJECT = 0x00000010;
        /// Archetype Object
        const RF_ARCHETYPE_OBJECT = 0x00000020;
        /// Transient
        const RF_TRANSIENT = 0x00000040;
        /// Mark as root set
        const RF_MARK_AS_ROOT_SET = 0x00000080;
        /// Tag Garbage Temp
        const RF_TAG_GARBAGE_TEMP = 0x00000100;
        /// Needs initialization
        const RF_NEED_INITIALIZATION = 0x00000200;
        /// Needs load
        const RF_NEED_LOAD = 0x00000400;
        /// Keep object for cooker
        const RF_KEEP_FOR_COOKER = 0x00000800;
        /// Needed post load
        const RF_NEED_POST_LOAD = 0x00001000;
        /// Needed post load subobjects
        const RF_NEED_POST_LOAD_SUBOBJECTS = 0x00002000;
        /// A newer version of the object exists
        const RF_NEWER_VERSION_EXISTS = 0x00004000;
        /// Set when the object is starting to get destroyed
        const RF_BEGIN_DESTROYED = 0x00008000;
        /// Set when the object is finished being destroyed
        const RF_FINISH_DESTROYED = 0x00010000;
        /// Object is being regenerated
        const RF_BEING_REGENERATED = 0x00020000;
        /// Object is the default sub object
        const RF_DEFAULT_SUB_OBJECT = 0x00040000;
        /// Object was loaded
        const RF_WAS_LOADED = 0x00080000;
        /// Text export transient
        const RF_TEXT_EXPORT_TRANSIENT = 0x00100000;
        /// Load of this object was completed
        const RF_LOAD_COMPLETED = 0x00200000;
        /// Object is an inheritable component template
        const RF_INHERITABLE_COMPONENT_TEMPLATE = 0x00400000;
        /// Duplicate transient
        const RF_DUPLICATE_TRANSIENT = 0x00800000;
        /// Strong ref on frame
        const RF_STRONG_REF_ON_FRAME = 0x01000000;
        /// Non pie duplicate transient
        const RF_NON_P_I_E_DUPLICATE_TRANSIENT = 0x02000000;
        /// Object is dynamic
        const RF_DYNAMIC = 0x04000000;
        /// Object will be loaded
        const RF_WILL_BE_LOADED = 0x08000000;
        /// Object has an external package
        const RF_HAS_EXTERNAL_PACKAGE = 0x10000000;
    }

    /// Package flags
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EPackageFlags : u32
    {
        /// No flags
        const PKG_NONE = 0x00000000;
        /// Newly created package, not saved yet. In editor only.
        const PKG_NEWLY_CREATED = 0x00000001;
        /// Purely optional for clients.
        const PKG_CLIENT_OPTIONAL = 0x00000002;
        /// Only needed on the server side.
        const PKG_SERVER_SIDE_ONLY = 0x00000004;
        /// This package is from "compiled in" classes.
        const PKG_COMPILED_IN = 0x00000010;
        /// This package was loaded just for the purposes of diffing
        const PKG_FOR_DIFFING = 0x00000020;
        /// This is editor-only package (for example: editor module script package)
        const PKG_EDITOR_ONLY = 0x00000040;
        /// Developer module
        const PKG_DEVELOPER = 0x00000080;
        /// Loaded only in uncooked builds (i.e. runtime in editor)
        const PKG_UNCOOKED_ONLY = 0x00000100;
        /// Package is cooked
        const PKG_COOKED = 0x00000200;
        /// Package doesn't contain any asset object (although asset tags can be present)
        const PKG_CONTAINS_NO_ASSET = 0x00000400;
        /// Uses unversioned property serialization instead of versioned tagged property serialization
        const PKG_UNVERSIONED_PROPERTIES = 0x00002000;
        /// Contains map data (UObjects only referenced by a single ULevel) but is stored in a different package
        const PKG_CONTAINS_MAP_DATA = 0x00004000;
        /// Package is currently being compiled
        const PKG_COMPILING = 0x00010000;
        /// Set if the package contains a ULevel/UWorld object
        const PKG_CONTAINS_MAP = 0x00020000;
        /// Package requires localization gather
        const PKG_REQUIRES_LOCALIZATION_GATHER = 0x00040000;
        /// Set if the package was created for the purpose of PIE
        const PKG_PLAY_IN_EDITOR = 0x00100000;
        /// Package is allowed to contain UClass objects
        const PKG_CONTAINS_SCRIPT = 0x00200000;
        /// Editor should not export asset in this package
        const PKG_DISALLOW_EXPORT = 0x00400000;
        /// This package should resolve dynamic imports from its export at runtime.
        const PKG_DYNAMIC_IMPORTS = 0x10000000;
        /// This package contains elements that are runtime generated, and may not follow standard loading order rules
        const PKG_RUNTIME_GENERATED = 0x20000000;
        /// This package is reloading in the cooker, try to avoid getting data we will never need.
        const PKG_RELOADING_FOR_COOKER = 0x40000000;
        /// Package has editor-only data filtered out
        const PKG_FILTER_EDITOR_ONLY = 0x80000000;
    }
}

/// Zen export filter flags
///
/// A Zen export carries at most one filter, unlike the legacy per-client and
/// per-server booleans.
#[derive(
    Default, Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EExportFilterFlags {
    /// Loaded everywhere
    #[default]
    None,
    /// Not loaded on clients
    NotForClient,
    /// Not loaded on servers
    NotForServer,
}

impl EExportFilterFlags {
    /// Derive the filter from the legacy per-client/per-server booleans
    pub fn from_legacy(not_for_client: bool, not_for_server: bool) -> Self {
        match (not_for_client, not_for_server) {
            (true, _) => EExportFilterFlags::NotForClient,
            (false, true) => EExportFilterFlags::NotForServer,
            (false, false) => EExportFilterFlags::None,
        }
    }
}
