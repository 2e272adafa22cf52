//! Zen bulk data map

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};

use crate::error::Error;

/// Bulk data map entry, a fixed 32 bytes on disk
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BulkDataMapEntry {
    /// Serialized offset
    pub serial_offset: u64,
    /// Duplicate serialized offset
    pub dup_serial_offset: u64,
    /// Serialized size
    pub serial_size: u64,
    /// Flags
    pub flags: u32,
    /// Padding
    pub padding: u32,
}

impl BulkDataMapEntry {
    /// Read a `BulkDataMapEntry` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let serial_offset = reader.read_u64::<LE>()?;
        let dup_serial_offset = reader.read_u64::<LE>()?;
        let serial_size = reader.read_u64::<LE>()?;
        let flags = reader.read_u32::<LE>()?;
        let padding = reader.read_u32::<LE>()?;

        Ok(BulkDataMapEntry {
            serial_offset,
            dup_serial_offset,
            serial_size,
            flags,
            padding,
        })
    }

    /// Write a `BulkDataMapEntry` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u64::<LE>(self.serial_offset)?;
        writer.write_u64::<LE>(self.dup_serial_offset)?;
        writer.write_u64::<LE>(self.serial_size)?;
        writer.write_u32::<LE>(self.flags)?;
        writer.write_u32::<LE>(self.padding)?;

        Ok(())
    }

    /// Get `BulkDataMapEntry` serialized size
    #[inline(always)]
    pub fn serialized_size() -> u64 {
        32
    }
}
