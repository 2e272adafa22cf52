//! Name-table references

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;
use crate::name_map::NameMap;

/// A legacy name reference: name-table index plus number.
///
/// Number 0 means no suffix; number N > 0 renders as `_N-1`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct FName {
    /// Name map index
    pub index: i32,
    /// Number
    pub number: i32,
}

impl FName {
    /// Create a new `FName`
    pub fn new(index: i32, number: i32) -> Self {
        FName { index, number }
    }

    /// Read an `FName` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let index = reader.read_i32::<LE>()?;
        let number = reader.read_i32::<LE>()?;
        Ok(FName { index, number })
    }

    /// Write an `FName` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_i32::<LE>(self.index)?;
        writer.write_i32::<LE>(self.number)?;
        Ok(())
    }

    /// Resolve the base string through a name map
    pub fn resolve<'a>(&self, name_map: &'a NameMap) -> Result<&'a str, Error> {
        name_map.get_name_reference(self.index)
    }

    /// Resolve the full string, including the `_N-1` number suffix
    pub fn resolve_with_number(&self, name_map: &NameMap) -> Result<String, Error> {
        let base = self.resolve(name_map)?;
        Ok(match self.number {
            0 => base.to_string(),
            number => format!("{}_{}", base, number - 1),
        })
    }
}

/// IoStore mapped name type
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EMappedNameType {
    /// Package-level name table
    #[default]
    Package,
    /// Container-level name table
    Container,
    /// Global name table
    Global,
}

/// A Zen name reference: 30-bit name-table index, 2-bit table selector and
/// a number.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct FMappedName {
    /// Name index
    pub index: u32,
    /// Name number
    pub number: u32,
    /// Name table the index points into
    pub ty: EMappedNameType,
}

impl FMappedName {
    /// FMappedName index bits
    pub const INDEX_BITS: u32 = 30;
    /// FMappedName index mask
    pub const INDEX_MASK: u32 = (1u32 << Self::INDEX_BITS).overflowing_sub(1).0;
    /// FMappedName type mask
    pub const TYPE_MASK: u32 = !Self::INDEX_MASK;
    /// FMappedName type shift
    pub const TYPE_SHIFT: u32 = Self::INDEX_BITS;

    /// Create a new `FMappedName` pointing into the package name table
    pub fn new(index: u32, number: u32) -> Self {
        FMappedName {
            index,
            number,
            ty: EMappedNameType::Package,
        }
    }

    /// Read an `FMappedName` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let index = reader.read_u32::<LE>()?;
        let number = reader.read_u32::<LE>()?;

        let ty = match (index & Self::TYPE_MASK) >> Self::TYPE_SHIFT {
            0 => EMappedNameType::Package,
            1 => EMappedNameType::Container,
            2 => EMappedNameType::Global,
            other => {
                return Err(Error::InvalidEnumValue(
                    format!("Invalid mapped name type {other}").into_boxed_str(),
                ))
            }
        };

        Ok(FMappedName {
            index: index & Self::INDEX_MASK,
            number,
            ty,
        })
    }

    /// Write an `FMappedName` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let index = self.index & Self::INDEX_MASK | (self.ty as u32) << Self::TYPE_SHIFT;

        writer.write_u32::<LE>(index)?;
        writer.write_u32::<LE>(self.number)?;

        Ok(())
    }

    /// Resolve the base string through a name map
    pub fn resolve<'a>(&self, name_map: &'a NameMap) -> Result<&'a str, Error> {
        name_map.get_name_reference(self.index as i32)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn mapped_name_packing() {
        let name = FMappedName {
            index: 0x2fff_fffe,
            number: 4,
            ty: EMappedNameType::Global,
        };

        let mut cursor = Cursor::new(Vec::new());
        name.write(&mut cursor).unwrap();

        let read = FMappedName::read(&mut Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(read, name);
    }
}
