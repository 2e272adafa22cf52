//! Class-specific export payload adjustments
//!
//! A few export classes ship with a trailing empty tag container (an `i32`
//! count of zero) behind each of their sub-records. Legacy cooks predating
//! that layout need the padding injected during conversion; payloads that
//! already carry it pass through untouched.

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use zen_helpers::{UnrealReadExt, UnrealWriteExt};

use crate::error::Error;
use crate::name_map::NameMap;
use crate::types::fname::FName;

/// Export class families with custom conversion handling; everything else
/// takes the passthrough path
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ExportClassFamily {
    /// Animation blueprint, hand-tuned bundle schedule
    AnimBlueprint,
    /// Skeletal mesh, tag containers behind material slots
    SkeletalMesh,
    /// String table, tag containers behind entries
    StringTable,
    /// No custom handling
    #[default]
    Other,
}

impl ExportClassFamily {
    /// Classify an export by its class name
    pub fn from_class_name(class_name: &str) -> Self {
        match class_name {
            "AnimBlueprint" | "AnimBlueprintGeneratedClass" => ExportClassFamily::AnimBlueprint,
            "SkeletalMesh" => ExportClassFamily::SkeletalMesh,
            "StringTable" => ExportClassFamily::StringTable,
            _ => ExportClassFamily::Other,
        }
    }
}

/// Result of a payload rewrite
pub enum Rewrite {
    /// The payload already carries the padding
    AlreadyPadded,
    /// The payload was re-serialized
    Rewritten(Vec<u8>),
}

fn verify_delta(original: usize, rewritten: &[u8], expected_delta: u64) -> Result<(), Error> {
    let actual = (rewritten.len() - original) as u64;
    if actual != expected_delta {
        return Err(Error::ClassSpecificRewriteMismatch(expected_delta, actual));
    }
    Ok(())
}

/// Parsed string table payload: a namespace plus ordered (key, value) pairs
struct StringTablePayload {
    namespace: Option<String>,
    entries: Vec<(Option<String>, Option<String>)>,
}

impl StringTablePayload {
    /// Parse, expecting a tag container behind each entry and one trailing
    /// when `padded`; succeeds only if the whole buffer is consumed
    fn parse(data: &[u8], padded: bool) -> Result<Self, Error> {
        let mut reader = Cursor::new(data);

        let namespace = reader.read_fstring()?;

        let count = reader.read_i32::<LE>()?;
        if count < 0 {
            return Err(Error::payload_rewrite(format!(
                "String table entry count {count} is negative"
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = reader.read_fstring()?;
            let value = reader.read_fstring()?;
            if padded {
                let tags = reader.read_i32::<LE>()?;
                if tags != 0 {
                    return Err(Error::payload_rewrite(format!(
                        "Expected an empty tag container, found {tags} tags"
                    )));
                }
            }
            entries.push((key, value));
        }

        if padded {
            let tags = reader.read_i32::<LE>()?;
            if tags != 0 {
                return Err(Error::payload_rewrite(format!(
                    "Expected an empty trailing tag container, found {tags} tags"
                )));
            }
        }

        if reader.position() != data.len() as u64 {
            return Err(Error::payload_rewrite(format!(
                "String table payload has {} trailing bytes",
                data.len() as u64 - reader.position()
            )));
        }

        Ok(StringTablePayload { namespace, entries })
    }

    fn write_padded(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Cursor::new(Vec::new());

        writer.write_fstring(self.namespace.as_deref())?;
        writer.write_i32::<LE>(self.entries.len() as i32)?;
        for (key, value) in &self.entries {
            writer.write_fstring(key.as_deref())?;
            writer.write_fstring(value.as_deref())?;
            writer.write_i32::<LE>(0)?;
        }
        writer.write_i32::<LE>(0)?;

        Ok(writer.into_inner())
    }
}

/// Re-serialize a string table payload with an empty tag container behind
/// each (key, value) entry plus one trailing container
pub fn rewrite_string_table(data: &[u8]) -> Result<Rewrite, Error> {
    if StringTablePayload::parse(data, true).is_ok() {
        return Ok(Rewrite::AlreadyPadded);
    }

    let payload = StringTablePayload::parse(data, false)?;
    let rewritten = payload.write_padded()?;

    verify_delta(data.len(), &rewritten, 4 * (payload.entries.len() as u64 + 1))?;

    Ok(Rewrite::Rewritten(rewritten))
}

/// One serialized skeletal mesh material slot
#[derive(Debug, Clone, PartialEq)]
struct MaterialSlot {
    material_interface: i32,
    slot_name: FName,
    imported_slot_name: FName,
    uv_channel_data: [u8; 20],
}

impl MaterialSlot {
    const SERIALIZED_SIZE: u64 = 40;

    fn read(reader: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        let material_interface = reader.read_i32::<LE>()?;
        let slot_name = FName::read(reader)?;
        let imported_slot_name = FName::read(reader)?;

        let mut uv_channel_data = [0u8; 20];
        reader.read_exact(&mut uv_channel_data)?;

        Ok(MaterialSlot {
            material_interface,
            slot_name,
            imported_slot_name,
            uv_channel_data,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_i32::<LE>(self.material_interface)?;
        self.slot_name.write(writer)?;
        self.imported_slot_name.write(writer)?;
        writer.write_all(&self.uv_channel_data)?;
        Ok(())
    }

    /// Plausibility check against the owning package's tables
    fn is_valid(&self, name_map: &NameMap, import_count: usize, export_count: usize) -> bool {
        let name_ok = |name: &FName| {
            name.index >= 0
                && (name.index as usize) < name_map.len()
                && (0..=0xffff).contains(&name.number)
        };
        let index_ok = match self.material_interface {
            0 => true,
            i if i > 0 => (i as usize) <= export_count,
            i => ((-i) as usize) <= import_count,
        };

        let initialized_ok = self.uv_channel_data[..4] == [0, 0, 0, 0]
            || self.uv_channel_data[..4] == [1, 0, 0, 0];

        index_ok && name_ok(&self.slot_name) && name_ok(&self.imported_slot_name) && initialized_ok
    }
}

/// Located material array inside a skeletal mesh payload
struct MaterialArray {
    offset: u64,
    slots: Vec<MaterialSlot>,
    padded: bool,
    end: u64,
}

/// Scan a skeletal mesh payload for its serialized material array: an `i32`
/// slot count followed by that many 40-byte slot records, each validated
/// against the package's name table and index ranges
fn locate_material_array(
    data: &[u8],
    name_map: &NameMap,
    import_count: usize,
    export_count: usize,
) -> Option<MaterialArray> {
    let mut reader = Cursor::new(data);

    for offset in 0..data.len().saturating_sub(4) {
        reader.seek(SeekFrom::Start(offset as u64)).ok()?;
        let count = reader.read_i32::<LE>().ok()?;
        if !(1..=256).contains(&count) {
            continue;
        }

        // the already-padded interpretation wins when both parse
        for padded in [true, false] {
            reader.seek(SeekFrom::Start(offset as u64 + 4)).ok()?;

            let mut slots = Vec::with_capacity(count as usize);
            let mut valid = true;
            for _ in 0..count {
                let Ok(slot) = MaterialSlot::read(&mut reader) else {
                    valid = false;
                    break;
                };
                if !slot.is_valid(name_map, import_count, export_count) {
                    valid = false;
                    break;
                }
                if padded {
                    match reader.read_i32::<LE>() {
                        Ok(0) => {}
                        _ => {
                            valid = false;
                            break;
                        }
                    }
                }
                slots.push(slot);
            }

            if valid {
                return Some(MaterialArray {
                    offset: offset as u64,
                    slots,
                    padded,
                    end: reader.position(),
                });
            }
        }
    }

    None
}

/// Re-serialize a skeletal mesh payload with an empty tag container behind
/// each material slot.
///
/// `slot_tags`, when provided, carries tag names to inject per slot instead
/// of an empty container (sourced from `MaterialTagAssetUserData` upstream).
pub fn rewrite_skeletal_mesh(
    data: &[u8],
    name_map: &NameMap,
    import_count: usize,
    export_count: usize,
    slot_tags: Option<&[Vec<FName>]>,
) -> Result<Rewrite, Error> {
    let array = locate_material_array(data, name_map, import_count, export_count)
        .ok_or_else(|| {
            Error::payload_rewrite(
                "No material slot array found in skeletal mesh payload".to_string(),
            )
        })?;

    if array.padded && slot_tags.is_none() {
        return Ok(Rewrite::AlreadyPadded);
    }

    let mut writer = Cursor::new(Vec::new());
    writer.write_all(&data[..array.offset as usize])?;
    writer.write_i32::<LE>(array.slots.len() as i32)?;

    let mut injected = 0u64;
    for (i, slot) in array.slots.iter().enumerate() {
        slot.write(&mut writer)?;

        let tags = slot_tags.and_then(|tags| tags.get(i));
        match tags {
            Some(tags) => {
                writer.write_i32::<LE>(tags.len() as i32)?;
                for tag in tags {
                    tag.write(&mut writer)?;
                    injected += 8;
                }
            }
            None => writer.write_i32::<LE>(0)?,
        }
    }

    writer.write_all(&data[array.end as usize..])?;

    let rewritten = writer.into_inner();
    let pad_words = match array.padded {
        true => 0,
        false => array.slots.len() as u64,
    };
    verify_delta(data.len(), &rewritten, 4 * pad_words + injected)?;

    Ok(Rewrite::Rewritten(rewritten))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_table(padded: bool) -> Vec<u8> {
        let mut writer = Cursor::new(Vec::new());
        writer.write_fstring(Some("Namespace")).unwrap();
        writer.write_i32::<LE>(2).unwrap();
        for (key, value) in [("KeyA", "ValueA"), ("KeyB", "ValueB")] {
            writer.write_fstring(Some(key)).unwrap();
            writer.write_fstring(Some(value)).unwrap();
            if padded {
                writer.write_i32::<LE>(0).unwrap();
            }
        }
        if padded {
            writer.write_i32::<LE>(0).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn string_table_gets_padded() {
        let unpadded = string_table(false);
        let expected = string_table(true);

        match rewrite_string_table(&unpadded).unwrap() {
            Rewrite::Rewritten(rewritten) => assert_eq!(rewritten, expected),
            Rewrite::AlreadyPadded => panic!("expected a rewrite"),
        }
    }

    #[test]
    fn padded_string_table_is_skipped() {
        let padded = string_table(true);
        assert!(matches!(
            rewrite_string_table(&padded).unwrap(),
            Rewrite::AlreadyPadded
        ));
    }

    #[test]
    fn truncated_string_table_is_rejected() {
        let mut truncated = string_table(false);
        truncated.pop();
        assert!(rewrite_string_table(&truncated).is_err());
    }

    fn material_name_map() -> NameMap {
        let mut name_map = NameMap::new();
        name_map.add_name_reference("MaterialA".to_string(), false);
        name_map.add_name_reference("MaterialB".to_string(), false);
        name_map
    }

    fn skeletal_mesh(padded: bool) -> Vec<u8> {
        let mut writer = Cursor::new(Vec::new());
        writer.write_all(&[0xee; 12]).unwrap(); // leading opaque bytes

        writer.write_i32::<LE>(2).unwrap();
        for slot in 0..2i32 {
            writer.write_i32::<LE>(-1).unwrap(); // material interface import
            FName::new(slot, 0).write(&mut writer).unwrap();
            FName::new(slot, 0).write(&mut writer).unwrap();
            writer.write_i32::<LE>(1).unwrap(); // uv data initialized
            writer.write_all(&[0u8; 16]).unwrap();
            if padded {
                writer.write_i32::<LE>(0).unwrap();
            }
        }

        writer.write_all(&[0xdd; 8]).unwrap(); // trailing opaque bytes
        writer.into_inner()
    }

    #[test]
    fn skeletal_mesh_gets_padded() {
        let name_map = material_name_map();

        let unpadded = skeletal_mesh(false);
        let expected = skeletal_mesh(true);

        match rewrite_skeletal_mesh(&unpadded, &name_map, 1, 1, None).unwrap() {
            Rewrite::Rewritten(rewritten) => assert_eq!(rewritten, expected),
            Rewrite::AlreadyPadded => panic!("expected a rewrite"),
        }
    }

    #[test]
    fn padded_skeletal_mesh_is_skipped() {
        let name_map = material_name_map();

        let padded = skeletal_mesh(true);
        assert!(matches!(
            rewrite_skeletal_mesh(&padded, &name_map, 1, 1, None).unwrap(),
            Rewrite::AlreadyPadded
        ));
    }
}
