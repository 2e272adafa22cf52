//! String hashing used by name batches and package identifiers

use naive_cityhash::cityhash64;

use crate::types::package_object_index::PackageObjectIndex;

/// Lowercase a string using invariant (ASCII-only) casing.
///
/// The engine folds case byte-wise, so locale-aware lowercasing would change
/// hashes for content that round-trips through it.
pub fn to_lower_string(value: &str) -> String {
    value
        .chars()
        .map(|c| match c.is_ascii() {
            true => c.to_ascii_lowercase(),
            false => c,
        })
        .collect()
}

/// CityHash64 of the lowercased UTF-8 bytes of `value`
pub fn cityhash64_to_lower(value: &str) -> u64 {
    cityhash64(to_lower_string(value).as_bytes())
}

/// CityHash64 of the lowercased UTF-16LE bytes of `value`
pub fn cityhash64_utf16_to_lower(value: &str) -> u64 {
    let lower = to_lower_string(value);
    let mut bytes = Vec::with_capacity(lower.len() * 2);
    for word in lower.encode_utf16() {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    cityhash64(&bytes)
}

/// Hash an object path within its package for cross-package addressing.
///
/// The path must not include the package prefix or a leading slash.
pub fn public_export_hash(export_path: &str) -> u64 {
    cityhash64_utf16_to_lower(export_path)
}

const fn make_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = match crc & 1 {
                0 => crc >> 1,
                _ => (crc >> 1) ^ 0xedb88320,
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC32_TABLE: [u32; 256] = make_crc32_table();

/// CRC32 over the code points of a string, each fed as four bytes the way
/// the engine's string CRC does
pub fn str_crc32(value: &str) -> u32 {
    let mut crc = 0xffffffffu32;
    for ch in value.chars() {
        let mut c = ch as u32;
        for _ in 0..4 {
            crc = (crc >> 8) ^ CRC32_TABLE[((crc ^ c) & 0xff) as usize];
            c >>= 8;
        }
    }
    !crc
}

/// Case-insensitive 16-bit name hash stored in legacy name tables
pub fn non_case_preserving_hash(value: &str) -> u16 {
    str_crc32(&to_lower_string(value)) as u16
}

/// Case-sensitive 16-bit name hash stored in legacy name tables
pub fn case_preserving_hash(value: &str) -> u16 {
    str_crc32(value) as u16
}

/// Hash a `/Script/...` object path into a 62-bit script import id.
///
/// `:` and `.` subobject separators collapse to `/` before hashing; the top
/// two bits are cleared so the index type tag stays authoritative.
pub fn script_import_hash(object_path: &str) -> u64 {
    let normalized = object_path.replace([':', '.'], "/");
    cityhash64_utf16_to_lower(&normalized) & PackageObjectIndex::INDEX_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_anchor() {
        // reference vector from the CityHash test suite
        assert_eq!(cityhash64(b""), 0x9ae16a3b2f90404f);
        assert_eq!(cityhash64_to_lower(""), 0x9ae16a3b2f90404f);
    }

    #[test]
    fn lowercase_is_ascii_only() {
        assert_eq!(to_lower_string("/Game/Ä/Mesh"), "/game/Ä/mesh");
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(
            cityhash64_to_lower("/Game/A/B"),
            cityhash64_to_lower("/game/a/b")
        );
        assert_eq!(
            cityhash64_utf16_to_lower("Mesh"),
            cityhash64_utf16_to_lower("mesh")
        );
    }

    #[test]
    fn script_import_hash_top_bits_clear() {
        for path in [
            "/Script/Engine/StaticMesh",
            "/Script/CoreUObject.Object",
            "/Script/Engine.Default__StaticMesh:SubObject",
        ] {
            let hash = script_import_hash(path);
            assert_eq!(hash >> PackageObjectIndex::INDEX_BITS, 0);
        }
    }

    #[test]
    fn script_import_hash_normalizes_separators() {
        assert_eq!(
            script_import_hash("/Script/CoreUObject.Object"),
            script_import_hash("/Script/CoreUObject/Object")
        );
    }
}
