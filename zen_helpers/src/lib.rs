#![deny(missing_docs)]

//! Extensions for reading and writing Unreal Engine data formats.

pub mod error;
pub mod guid;
pub mod read_ext;
pub mod write_ext;

pub use guid::Guid;
pub use read_ext::UnrealReadExt;
pub use write_ext::UnrealWriteExt;
