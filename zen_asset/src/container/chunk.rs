//! Container chunk ids

use std::io::{Cursor, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, BE, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::Error;
use crate::zen::package_id::PackageId;

/// Chunk kinds the codec consumes
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EIoChunkType {
    /// Invalid
    Invalid = 0,
    /// The Zen package bytes of a package
    ExportBundleData = 1,
    /// Separate bulk payload of a package
    BulkData = 2,
    /// Optional bulk data
    OptionalBulkData = 3,
    /// Memory mapped bulk data
    MemoryMappedBulkData = 4,
    /// The script object database blob
    ScriptObjects = 5,
    /// The container header
    ContainerHeader = 6,
    /// External file
    ExternalFile = 7,
    /// Shader code library
    ShaderCodeLibrary = 8,
    /// Shader code
    ShaderCode = 9,
    /// Package store entry
    PackageStoreEntry = 10,
    /// Derived data
    DerivedData = 11,
    /// Editor derived data
    EditorDerivedData = 12,
}

/// Container chunk id: a 64-bit key (the package id for package chunks), a
/// 16-bit secondary index and the chunk type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IoChunkId {
    /// Chunk id
    pub chunk_id: u64,
    /// Chunk index
    pub chunk_index: u16,
    /// Chunk type
    pub chunk_type: u8,
}

impl IoChunkId {
    /// Create a new chunk id
    pub fn new(chunk_id: u64, chunk_index: u16, chunk_type: EIoChunkType) -> IoChunkId {
        IoChunkId {
            chunk_id,
            chunk_index,
            chunk_type: chunk_type as u8,
        }
    }

    /// Create a chunk id keyed by a package id
    pub fn from_package_id(
        package_id: PackageId,
        chunk_index: u16,
        chunk_type: EIoChunkType,
    ) -> IoChunkId {
        Self::new(package_id.id, chunk_index, chunk_type)
    }

    /// Read an `IoChunkId` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let chunk_id = reader.read_u64::<LE>()?;
        let chunk_index = reader.read_u16::<BE>()?;

        let _ = reader.read_u8()?; // padding

        let chunk_type = reader.read_u8()?;

        Ok(IoChunkId {
            chunk_id,
            chunk_index,
            chunk_type,
        })
    }

    /// Write an `IoChunkId` to a writer
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        writer.write_u64::<LE>(self.chunk_id)?;
        writer.write_u16::<BE>(self.chunk_index)?;

        writer.write_u8(0)?; // padding

        writer.write_u8(self.chunk_type)?;

        Ok(())
    }

    /// Hash an `IoChunkId` for probing the perfect-hash table
    pub fn hash(&self, seed: i32) -> Result<u64, Error> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(&mut cursor)?;

        let data = cursor.into_inner();
        let mut hash = match seed {
            0 => 0xcbf29ce484222325,
            _ => seed as u64,
        };

        for byte in data {
            hash = hash.overflowing_mul(0x00000100000001B3).0 ^ byte as u64;
        }

        Ok(hash)
    }
}

/// Container chunk content hash
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IoChunkHash {
    /// Value
    pub value: [u8; 32],
}

impl IoChunkHash {
    /// Read an `IoChunkHash` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut value = [0u8; 32];
        reader.read_exact(&mut value)?;
        Ok(IoChunkHash { value })
    }
}
