//! `.utoc` parsing

use std::io::{Cursor, Read, Seek, SeekFrom};

use bitflags::bitflags;
use byteorder::{ReadBytesExt, LE};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use zen_helpers::{Guid, UnrealReadExt};

use crate::container::chunk::{IoChunkHash, IoChunkId};
use crate::container::compression::CompressionMethod;
use crate::container::encryption::{self, EncryptionKey};
use crate::container::index::IoStoreDirectoryIndex;
use crate::error::{ContainerError, Error};

bitflags! {
    /// Container flags
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EIoContainerFlags : u8 {
        /// None
        const NONE = 0x0;
        /// Compressed
        const COMPRESSED = (1 << 0);
        /// Encrypted
        const ENCRYPTED = (1 << 1);
        /// Signed
        const SIGNED = (1 << 2);
        /// Indexed
        const INDEXED = (1 << 3);
    }

    /// `.utoc` entry metadata flags
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct IoStoreTocEntryMetaFlags : u8 {
        /// None
        const NONE = 0x0;
        /// Compressed
        const COMPRESSED = (1 << 0);
        /// Memory mapped
        const MEMORY_MAPPED = (1 << 1);
    }
}

/// `.utoc` format version
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum EIoStoreTocVersion {
    /// Invalid
    Invalid = 0,
    /// Initial version
    Initial,
    /// Directory index added
    DirectoryIndex,
    /// Partition size added
    PartitionSize,
    /// Perfect hashing added
    PerfectHash,
    /// Perfect hashing with overflow added
    PerfectHashWithOverflow,
    /// On-demand meta data
    OnDemandMetaData,
    /// On-demand meta data removed again
    RemovedOnDemandMetaData,
    /// Replace IoChunkHash with IoHash
    ReplaceIoChunkHashWithIoHash,
}

/// Combined 5-byte offset and 5-byte length pair
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IoOffsetAndLength {
    /// Offset
    pub offset: u64,
    /// Length
    pub length: u64,
}

impl IoOffsetAndLength {
    /// Read an `IoOffsetAndLength` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut value = [0u8; 10];
        reader.read_exact(&mut value)?;

        let offset = (value[4] as u64)
            | ((value[3] as u64) << 8)
            | ((value[2] as u64) << 16)
            | ((value[1] as u64) << 24)
            | ((value[0] as u64) << 32);

        let length = (value[9] as u64)
            | ((value[8] as u64) << 8)
            | ((value[7] as u64) << 16)
            | ((value[6] as u64) << 24)
            | ((value[5] as u64) << 32);

        Ok(IoOffsetAndLength { offset, length })
    }
}

/// Compression block entry, 12 packed bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IoStoreTocCompressedBlockEntry {
    /// Block offset
    pub offset: u64,
    /// Block compressed size
    pub compressed_size: u32,
    /// Block decompressed size
    pub decompressed_size: u32,
    /// Compression method index, 1-based; 0 means uncompressed
    pub compression_method_index: u8,
}

impl IoStoreTocCompressedBlockEntry {
    const OFFSET_BITS: u64 = 40;
    const OFFSET_MASK: u64 = (1u64 << Self::OFFSET_BITS).overflowing_sub(1).0;

    const SIZE_BITS: u32 = 24;
    const SIZE_MASK: u32 = (1u32 << Self::SIZE_BITS).overflowing_sub(1).0;
    const SIZE_SHIFT: u32 = 8;

    /// Read an `IoStoreTocCompressedBlockEntry` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let mut value = [0u8; 12];
        reader.read_exact(&mut value)?;

        let offset = u64::from_le_bytes(value[..8].try_into().unwrap()) & Self::OFFSET_MASK;

        let compressed_size = (u32::from_le_bytes(value[4..8].try_into().unwrap())
            >> Self::SIZE_SHIFT)
            & Self::SIZE_MASK;
        let decompressed_size =
            u32::from_le_bytes(value[8..12].try_into().unwrap()) & Self::SIZE_MASK;

        let compression_method_index = value[11];

        Ok(IoStoreTocCompressedBlockEntry {
            offset,
            compressed_size,
            decompressed_size,
            compression_method_index,
        })
    }
}

/// `.utoc` entry metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoStoreTocEntryMeta {
    /// Chunk hash
    pub chunk_hash: IoChunkHash,
    /// Flags
    pub flags: IoStoreTocEntryMetaFlags,
}

impl IoStoreTocEntryMeta {
    /// Read an `IoStoreTocEntryMeta` from a reader
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, Error> {
        let chunk_hash = IoChunkHash::read(reader)?;
        let flags = IoStoreTocEntryMetaFlags::from_bits_retain(reader.read_u8()?);

        Ok(IoStoreTocEntryMeta { chunk_hash, flags })
    }
}

/// `.utoc` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoStoreTocHeader {
    /// Version
    pub version: EIoStoreTocVersion,
    /// Header size
    pub header_size: u32,
    /// Entry count
    pub entry_count: u32,
    /// Compressed block entry count
    pub compressed_block_entry_count: u32,
    /// Compressed block entry size
    pub compressed_block_entry_size: u32,
    /// Compression method name count
    pub compression_method_name_count: u32,
    /// Compression method name length
    pub compression_method_name_length: u32,
    /// Compression block size
    pub compression_block_size: u32,
    /// Directory index size
    pub directory_index_size: u32,
    /// Partition count
    pub partition_count: u32,
    /// Container id
    pub container_id: u64,
    /// Encryption key guid
    pub encryption_key_guid: Guid,
    /// Container flags
    pub container_flags: EIoContainerFlags,
    /// Chunk perfect hash seeds count
    pub chunk_perfect_hash_seeds_count: u32,
    /// Partition size
    pub partition_size: u64,
    /// Chunks without perfect hash count
    pub chunks_without_perfect_hash_count: u32,
}

impl IoStoreTocHeader {
    const TOC_MAGIC: [u8; 16] = *b"-==--==--==--==-";
    const SERIALIZED_SIZE: u32 = 144;

    /// Read an `IoStoreTocHeader` from a reader
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<IoStoreTocHeader, Error> {
        let mut magic = [0u8; 16];
        reader.read_exact(&mut magic)?;

        if magic != Self::TOC_MAGIC {
            return Err(ContainerError::InvalidTocMagic(magic).into());
        }

        let version = EIoStoreTocVersion::try_from(reader.read_u8()?)
            .map_err(ContainerError::from)?;

        let mut reserved = [0u8; 3];
        reader.read_exact(&mut reserved)?;

        let header_size = reader.read_u32::<LE>()?;
        if header_size != Self::SERIALIZED_SIZE {
            return Err(
                ContainerError::InvalidTocHeaderSize(Self::SERIALIZED_SIZE, header_size).into(),
            );
        }

        let entry_count = reader.read_u32::<LE>()?;
        let compressed_block_entry_count = reader.read_u32::<LE>()?;
        let compressed_block_entry_size = reader.read_u32::<LE>()?;
        let compression_method_name_count = reader.read_u32::<LE>()?;
        let compression_method_name_length = reader.read_u32::<LE>()?;
        let compression_block_size = reader.read_u32::<LE>()?;
        let directory_index_size = reader.read_u32::<LE>()?;
        let mut partition_count = reader.read_u32::<LE>()?;
        let container_id = reader.read_u64::<LE>()?;

        let encryption_key_guid = reader.read_guid()?;

        let container_flags = EIoContainerFlags::from_bits_retain(reader.read_u8()?);

        let mut reserved_0 = [0u8; 3];
        reader.read_exact(&mut reserved_0)?;

        let chunk_perfect_hash_seeds_count = reader.read_u32::<LE>()?;
        let mut partition_size = reader.read_u64::<LE>()?;
        let chunks_without_perfect_hash_count = reader.read_u32::<LE>()?;

        let mut reserved_1 = [0u8; 44];
        reader.read_exact(&mut reserved_1)?;

        if version < EIoStoreTocVersion::PartitionSize {
            partition_count = 1;
            partition_size = u64::MAX;
        }

        Ok(IoStoreTocHeader {
            version,
            header_size,
            entry_count,
            compressed_block_entry_count,
            compressed_block_entry_size,
            compression_method_name_count,
            compression_method_name_length,
            compression_block_size,
            directory_index_size,
            partition_count,
            container_id,
            encryption_key_guid,
            container_flags,
            chunk_perfect_hash_seeds_count,
            partition_size,
            chunks_without_perfect_hash_count,
        })
    }
}

/// Parsed `.utoc` resource
#[derive(Debug, Clone, PartialEq)]
pub struct IoStoreTocResource {
    /// Header
    pub header: IoStoreTocHeader,
    /// Chunk ids
    pub chunk_ids: Vec<IoChunkId>,
    /// Chunk offsets and lengths
    pub chunk_offsets_lengths: Vec<IoOffsetAndLength>,
    /// Chunk perfect hash seeds
    pub chunk_perfect_hash_seeds: Vec<i32>,
    /// Chunks without perfect hashes
    pub chunks_without_perfect_hash: Vec<u32>,
    /// Compression blocks
    pub compression_blocks: Vec<IoStoreTocCompressedBlockEntry>,
    /// Compression methods
    pub compression_methods: Vec<CompressionMethod>,
    /// Directory index
    pub directory_index: Option<IoStoreDirectoryIndex>,
    /// Chunk metas
    pub chunk_metas: Vec<IoStoreTocEntryMeta>,
}

impl IoStoreTocResource {
    /// Read an `IoStoreTocResource` from a reader
    pub fn read<R: Read + Seek>(
        reader: &mut R,
        encryption_key: Option<EncryptionKey>,
    ) -> Result<Self, Error> {
        let header = IoStoreTocHeader::read(reader)?;

        let mut chunk_ids = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            chunk_ids.push(IoChunkId::read(reader)?);
        }

        let mut chunk_offsets_lengths = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            chunk_offsets_lengths.push(IoOffsetAndLength::read(reader)?);
        }

        let mut chunk_perfect_hash_seeds = Vec::new();
        if header.version >= EIoStoreTocVersion::PerfectHash {
            for _ in 0..header.chunk_perfect_hash_seeds_count {
                chunk_perfect_hash_seeds.push(reader.read_i32::<LE>()?);
            }
        }

        let mut chunks_without_perfect_hash = Vec::new();
        if header.version >= EIoStoreTocVersion::PerfectHashWithOverflow {
            for _ in 0..header.chunks_without_perfect_hash_count {
                chunks_without_perfect_hash.push(reader.read_u32::<LE>()?);
            }
        }

        let mut compression_blocks =
            Vec::with_capacity(header.compressed_block_entry_count as usize);
        for _ in 0..header.compressed_block_entry_count {
            compression_blocks.push(IoStoreTocCompressedBlockEntry::read(reader)?);
        }

        let mut compression_methods =
            Vec::with_capacity(header.compression_method_name_count as usize);
        for _ in 0..header.compression_method_name_count {
            let mut data = vec![0u8; header.compression_method_name_length as usize];
            reader.read_exact(&mut data)?;

            let null_end = data.iter().position(|e| *e == 0x00).unwrap_or(data.len());
            data.resize(null_end, 0x00);

            compression_methods.push(CompressionMethod::new(&String::from_utf8(data)?));
        }

        if header.container_flags.contains(EIoContainerFlags::SIGNED) {
            let hash_size = reader.read_i32::<LE>()?;

            // toc signature, block signature, then a sha hash per block
            reader.seek(SeekFrom::Current(hash_size as i64 * 2))?;
            reader.seek(SeekFrom::Current(
                (header.compressed_block_entry_count * 20) as i64,
            ))?;
        }

        let directory_index = match header.container_flags.contains(EIoContainerFlags::INDEXED)
            && header.directory_index_size > 0
        {
            true => {
                match header
                    .container_flags
                    .contains(EIoContainerFlags::ENCRYPTED)
                {
                    true => {
                        let Some(encryption_key) = encryption_key else {
                            return Err(ContainerError::NoEncryptionKey.into());
                        };

                        let aes = encryption::create_cipher(&encryption_key);

                        let mut buf = vec![0u8; header.directory_index_size as usize];
                        reader.read_exact(&mut buf)?;

                        encryption::decrypt(&aes, &mut buf);

                        Some(IoStoreDirectoryIndex::read(&mut Cursor::new(buf))?)
                    }
                    false => Some(IoStoreDirectoryIndex::read(reader)?),
                }
            }
            false => None,
        };

        let mut chunk_metas = Vec::with_capacity(header.entry_count as usize);
        for _ in 0..header.entry_count {
            chunk_metas.push(IoStoreTocEntryMeta::read(reader)?);
        }

        Ok(IoStoreTocResource {
            header,
            chunk_ids,
            chunk_offsets_lengths,
            chunk_perfect_hash_seeds,
            chunks_without_perfect_hash,
            compression_blocks,
            compression_methods,
            directory_index,
            chunk_metas,
        })
    }

    /// Get chunk offset and length by chunk id
    pub fn get_chunk_offset(&self, id: &IoChunkId) -> Result<Option<IoOffsetAndLength>, Error> {
        if self.chunk_perfect_hash_seeds.is_empty() {
            return self.get_chunk_offset_imperfect(id);
        }

        let seed_index = id.hash(0)? as usize % self.chunk_perfect_hash_seeds.len();
        let seed = self.chunk_perfect_hash_seeds[seed_index];

        if seed == 0 {
            return Ok(None);
        }

        let slot = match seed < 0 {
            true => (-seed - 1) as usize,
            false => (id.hash(seed)? % self.header.entry_count as u64) as usize,
        };

        if slot >= self.chunk_ids.len() {
            return self.get_chunk_offset_imperfect(id);
        }

        if self.chunk_ids[slot] == *id {
            return Ok(Some(self.chunk_offsets_lengths[slot]));
        }

        self.get_chunk_offset_imperfect(id)
    }

    /// Get chunk offset and length by linear search
    fn get_chunk_offset_imperfect(
        &self,
        id: &IoChunkId,
    ) -> Result<Option<IoOffsetAndLength>, Error> {
        Ok(self
            .chunk_ids
            .iter()
            .position(|e| e == id)
            .map(|e| self.chunk_offsets_lengths[e]))
    }
}
