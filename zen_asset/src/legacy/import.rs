//! Legacy import table entry

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;
use crate::types::fname::FName;
use crate::types::package_index::PackageIndex;
use crate::version::ObjectVersionUE5;

/// Import table entry, referencing an object from another package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectImport {
    /// Package the class lives in
    pub class_package: FName,
    /// Class name
    pub class_name: FName,
    /// Outer index
    pub outer_index: PackageIndex,
    /// Object name
    pub object_name: FName,
    /// Is the import optional
    pub optional: bool,
}

impl ObjectImport {
    /// Create a new `ObjectImport` instance
    pub fn new(
        class_package: FName,
        class_name: FName,
        outer_index: PackageIndex,
        object_name: FName,
    ) -> Self {
        ObjectImport {
            class_package,
            class_name,
            outer_index,
            object_name,
            optional: false,
        }
    }

    /// Read an `ObjectImport` from a reader
    pub fn read<R: Read>(reader: &mut R, object_version_ue5: i32) -> Result<Self, Error> {
        let class_package = FName::read(reader)?;
        let class_name = FName::read(reader)?;
        let outer_index = PackageIndex::read(reader)?;
        let object_name = FName::read(reader)?;

        let optional = match object_version_ue5 >= ObjectVersionUE5::OPTIONAL_RESOURCES as i32 {
            true => reader.read_i32::<LE>()? == 1,
            false => false,
        };

        Ok(ObjectImport {
            class_package,
            class_name,
            outer_index,
            object_name,
            optional,
        })
    }

    /// Write an `ObjectImport` to a writer
    pub fn write<W: Write>(&self, writer: &mut W, object_version_ue5: i32) -> Result<(), Error> {
        self.class_package.write(writer)?;
        self.class_name.write(writer)?;
        self.outer_index.write(writer)?;
        self.object_name.write(writer)?;

        if object_version_ue5 >= ObjectVersionUE5::OPTIONAL_RESOURCES as i32 {
            writer.write_i32::<LE>(match self.optional {
                true => 1,
                false => 0,
            })?;
        }

        Ok(())
    }
}
