//! Name table interning and the serialized name batch

use std::collections::HashMap;
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{UnrealReadExt, UnrealWriteExt};

use crate::crc;
use crate::error::{Error, NameBatchError};
use crate::types::SerializedNameHeader;

/// Name batch hash algorithm tag for CityHash64 over lowercased bytes
pub const HASH_VERSION_CITYHASH64: u64 = 0x00000000C1640000;

/// An interning name table.
///
/// Names are deduplicated by exact (case sensitive) equality on insert and
/// never mutated once the table is sealed into a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMap {
    /// Name lookup
    name_map_lookup: HashMap<String, i32>,
    /// Name index list
    name_map_index_list: Vec<String>,
}

impl NameMap {
    /// Creates a new `NameMap` instance
    pub fn new() -> Self {
        NameMap::default()
    }

    /// Creates a new `NameMap` instance from a name batch
    pub fn from_name_batch(name_batch: &[String]) -> Self {
        let mut name_map = NameMap::new();
        name_map.name_map_index_list = Vec::with_capacity(name_batch.len());

        for name in name_batch {
            name_map.add_name_reference(name.clone(), false);
        }

        name_map
    }

    /// Search a name reference
    pub fn search_name_reference(&self, name: &str) -> Option<i32> {
        self.name_map_lookup.get(name).copied()
    }

    /// Add a name reference, returning the existing index unless
    /// `force_add_duplicates` is set
    pub fn add_name_reference(&mut self, name: String, force_add_duplicates: bool) -> i32 {
        if !force_add_duplicates {
            if let Some(existing) = self.search_name_reference(&name) {
                return existing;
            }
        }

        let index = self.name_map_index_list.len() as i32;
        self.name_map_index_list.push(name.clone());
        self.name_map_lookup.entry(name).or_insert(index);
        index
    }

    /// Get all names in index order
    pub fn get_name_map_index_list(&self) -> &[String] {
        &self.name_map_index_list
    }

    /// Get a name reference by index
    pub fn get_name_reference(&self, index: i32) -> Result<&str, Error> {
        if index < 0 || index >= self.name_map_index_list.len() as i32 {
            return Err(Error::malformed(format!(
                "Name map index out of range, name map size: {}, got: {}",
                self.name_map_index_list.len(),
                index
            )));
        }
        Ok(&self.name_map_index_list[index as usize])
    }

    /// Returns the number of names in the map
    pub fn len(&self) -> usize {
        self.name_map_index_list.len()
    }

    /// Returns if the name map is empty
    pub fn is_empty(&self) -> bool {
        self.name_map_index_list.is_empty()
    }
}

/// Is this name ASCII-representable, or does it serialize as UTF-16LE
fn is_wide(name: &str) -> bool {
    !name.chars().all(|c| (c as u32) <= 0x7f)
}

/// Hash a name over the lowercased bytes of its own serialized encoding
pub fn name_hash(name: &str) -> u64 {
    match is_wide(name) {
        true => crc::cityhash64_utf16_to_lower(name),
        false => crc::cityhash64_to_lower(name),
    }
}

/// Write a name batch: count, string-bytes total, algorithm tag, hashes,
/// big-endian length headers, then unaligned string bytes.
///
/// An empty batch writes the zero count only.
pub fn write_name_batch<W: Write>(writer: &mut W, names: &[String]) -> Result<(), Error> {
    writer.write_i32::<LE>(names.len() as i32)?;
    if names.is_empty() {
        return Ok(());
    }

    let mut string_bytes = 0u32;
    for name in names {
        string_bytes += match is_wide(name) {
            true => name.encode_utf16().count() as u32 * 2,
            false => name.len() as u32,
        };
    }

    writer.write_u32::<LE>(string_bytes)?;
    writer.write_u64::<LE>(HASH_VERSION_CITYHASH64)?;

    for name in names {
        writer.write_u64::<LE>(name_hash(name))?;
    }

    for name in names {
        let wide = is_wide(name);
        let header = SerializedNameHeader {
            is_wide: wide,
            len: match wide {
                true => name.encode_utf16().count() as i32,
                false => name.len() as i32,
            },
        };
        header.write(writer)?;
    }

    for name in names {
        writer.write_fstring_noterm(name)?;
    }

    Ok(())
}

/// Read a name batch written by [`write_name_batch`].
pub fn read_name_batch<R: Read>(reader: &mut R) -> Result<Vec<String>, Error> {
    let num_strings = reader.read_i32::<LE>()?;
    if num_strings == 0 {
        return Ok(Vec::new());
    }
    if num_strings < 0 {
        return Err(Error::malformed(format!(
            "Negative name batch count: {num_strings}"
        )));
    }

    let strings_length = reader.read_u32::<LE>()?;

    let hash_version = reader.read_u64::<LE>()?;
    if hash_version != HASH_VERSION_CITYHASH64 {
        return Err(NameBatchError::InvalidAlgorithm(hash_version).into());
    }

    let mut hashes = Vec::with_capacity(num_strings as usize);
    for _ in 0..num_strings {
        hashes.push(reader.read_u64::<LE>()?);
    }

    let mut headers = Vec::with_capacity(num_strings as usize);
    for _ in 0..num_strings {
        headers.push(SerializedNameHeader::read(reader)?);
    }

    let decoded_length: u64 = headers
        .iter()
        .map(|header| match header.is_wide {
            true => header.len as u64 * 2,
            false => header.len as u64,
        })
        .sum();
    if decoded_length != strings_length as u64 {
        return Err(NameBatchError::LengthMismatch(strings_length as u64, decoded_length).into());
    }

    let mut entries = Vec::with_capacity(num_strings as usize);
    for (header, expected_hash) in headers.iter().zip(hashes) {
        let name = reader.read_fstring_len_noterm(header.len, header.is_wide)?;

        let hash = name_hash(&name);
        if hash != expected_hash {
            return Err(
                NameBatchError::HashMismatch(expected_hash, hash, name.into_boxed_str()).into(),
            );
        }

        entries.push(name);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn roundtrip(names: &[String]) -> Vec<String> {
        let mut cursor = Cursor::new(Vec::new());
        write_name_batch(&mut cursor, names).unwrap();
        read_name_batch(&mut Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn intern_deduplicates() {
        let mut map = NameMap::new();
        let first = map.add_name_reference("Asset".to_string(), false);
        let second = map.add_name_reference("Asset".to_string(), false);
        let third = map.add_name_reference("asset".to_string(), false);

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn empty_batch() {
        let mut cursor = Cursor::new(Vec::new());
        write_name_batch(&mut cursor, &[]).unwrap();
        assert_eq!(cursor.get_ref().len(), 4);

        assert!(roundtrip(&[]).is_empty());
    }

    #[test]
    fn ascii_and_wide_roundtrip() {
        let names = vec![
            "Asset".to_string(),
            "/Game/Ünïcode/Path".to_string(),
            "".to_string(),
            "Default__MyAnimBP".to_string(),
        ];
        assert_eq!(roundtrip(&names), names);
    }

    #[test]
    fn max_wide_length_roundtrips() {
        // largest char count the 15 length bits can carry
        let name = "Ü".repeat(0x7fff);
        let names = vec![name];
        assert_eq!(roundtrip(&names), names);
    }

    #[test]
    fn bad_algorithm_tag() {
        let mut cursor = Cursor::new(Vec::new());
        write_name_batch(&mut cursor, &["A".to_string()]).unwrap();

        let mut data = cursor.into_inner();
        data[8] = 0xff; // clobber the algorithm tag

        assert!(matches!(
            read_name_batch(&mut Cursor::new(data)),
            Err(Error::NameBatch(NameBatchError::InvalidAlgorithm(_)))
        ));
    }

    #[test]
    fn string_bytes_must_match() {
        let mut cursor = Cursor::new(Vec::new());
        write_name_batch(&mut cursor, &["Asset".to_string()]).unwrap();

        let mut data = cursor.into_inner();
        data[4] += 1; // declared string bytes no longer match the headers

        assert!(matches!(
            read_name_batch(&mut Cursor::new(data)),
            Err(Error::NameBatch(NameBatchError::LengthMismatch(_, _)))
        ));
    }
}
