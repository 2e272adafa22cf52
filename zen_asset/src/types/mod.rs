//! Shared index and name-reference types

pub mod fname;
pub mod package_index;
pub mod package_object_index;

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::Error;

/// Serialized name header
///
/// A big-endian 16-bit value: the high bit selects a wide (UTF-16) string,
/// the low 15 bits carry the character count for wide strings or the byte
/// count for ASCII strings. Equivalently, wide strings store
/// `i16::MIN + char_count` and readers recover `char_count` as
/// `|i16::MIN - header|`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SerializedNameHeader {
    /// Is wide
    pub is_wide: bool,
    /// Name length
    pub len: i32,
}

impl SerializedNameHeader {
    /// Read a `SerializedNameHeader` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<SerializedNameHeader, Error> {
        let (first_byte, second_byte) = (reader.read_u8()?, reader.read_u8()?);

        Ok(SerializedNameHeader {
            is_wide: (first_byte & 0x80) > 0,
            len: (((first_byte & 0x7f) as i32) << 8) + second_byte as i32,
        })
    }

    /// Write a `SerializedNameHeader` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        let is_wide = match self.is_wide {
            true => 1u8,
            false => 0u8,
        };
        let first_byte = is_wide << 7 | (self.len >> 8) as u8;
        let second_byte = self.len as u8;

        writer.write_u8(first_byte)?;
        writer.write_u8(second_byte)?;

        Ok(())
    }
}
