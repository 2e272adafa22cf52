//! `.ucas` chunk reader

use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;

use aes::Aes256;

use crate::container::chunk::IoChunkId;
use crate::container::compression::{self, CompressionMethod};
use crate::container::encryption::{self, EncryptionKey, ENCRYPTION_ALIGN};
use crate::container::provider::IoStoreProvider;
use crate::container::toc::{EIoContainerFlags, IoStoreTocResource};
use crate::container::align;
use crate::error::{ContainerError, Error};

/// Reads chunk bytes out of a container's partition files, decrypting and
/// decompressing blocks as needed
pub struct IoStoreReader<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    /// Parsed `.utoc` resource
    pub toc_resource: IoStoreTocResource,
    /// Partition file provider
    provider: P,
    /// Container file stem, e.g. `global`
    file_name: String,
    /// Aes encryption key
    aes: Option<Aes256>,

    _marker: PhantomData<R>,
}

impl<R, P> IoStoreReader<R, P>
where
    R: Read + Seek,
    P: IoStoreProvider<R>,
{
    /// Create a new `IoStoreReader` instance
    pub fn new(
        provider: P,
        file_name: &str,
        toc_resource: IoStoreTocResource,
        encryption_key: Option<EncryptionKey>,
    ) -> Result<Self, Error> {
        if toc_resource
            .header
            .container_flags
            .contains(EIoContainerFlags::ENCRYPTED)
            && encryption_key.is_none()
        {
            return Err(ContainerError::NoEncryptionKey.into());
        }

        let aes = encryption_key.as_ref().map(encryption::create_cipher);

        Ok(IoStoreReader {
            toc_resource,
            provider,
            file_name: file_name.to_owned(),
            aes,
            _marker: PhantomData,
        })
    }

    /// Read a whole chunk by id
    pub fn read_chunk(&self, id: &IoChunkId) -> Result<Option<Vec<u8>>, Error> {
        let Some(chunk_info) = self.toc_resource.get_chunk_offset(id)? else {
            return Ok(None);
        };

        let mut data = vec![0u8; chunk_info.length as usize];
        self.read_all(chunk_info.offset, &mut data)?;
        Ok(Some(data))
    }

    /// Read decompressed container bytes at `offset` into `buf`
    pub fn read_all(&self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Ok(());
        }

        let compression_block_size = self.toc_resource.header.compression_block_size as u64;

        let first_block_index = offset / compression_block_size;
        let last_block_end = align(offset + buf.len() as u64, compression_block_size);
        let last_block_index = (last_block_end - 1) / compression_block_size;

        let mut remaining_size = buf.len();
        let mut offset_in_block = offset % compression_block_size;

        for block_index in first_block_index..=last_block_index {
            let compression_block = self
                .toc_resource
                .compression_blocks
                .get(block_index as usize)
                .ok_or_else(|| {
                    Error::malformed(format!(
                        "Compression block {block_index} is out of range"
                    ))
                })?;

            let partition_index =
                compression_block.offset / self.toc_resource.header.partition_size;
            let partition_offset =
                compression_block.offset % self.toc_resource.header.partition_size;

            let read_size =
                align(compression_block.compressed_size as u64, ENCRYPTION_ALIGN) as usize;

            let mut reader = self.create_partition_reader(partition_index)?;
            reader.seek(SeekFrom::Start(partition_offset))?;

            let mut data = vec![0u8; read_size];
            reader.read_exact(&mut data)?;

            if let Some(e) = &self.aes {
                encryption::decrypt(e, &mut data);
            };

            let compression_method = match compression_block.compression_method_index == 0 {
                true => CompressionMethod::None,
                false => self.toc_resource.compression_methods
                    [compression_block.compression_method_index as usize - 1]
                    .clone(),
            };

            let mut decompressed = vec![0u8; compression_block.decompressed_size as usize];
            compression::decompress(
                compression_method,
                &data[..compression_block.compressed_size as usize],
                &mut decompressed,
            )?;

            let size_to_read =
                remaining_size.min((compression_block_size - offset_in_block) as usize);
            let size_to_read =
                size_to_read.min(decompressed.len().saturating_sub(offset_in_block as usize));

            let buf_offset = buf.len() - remaining_size;
            buf[buf_offset..buf_offset + size_to_read].copy_from_slice(
                &decompressed[offset_in_block as usize..offset_in_block as usize + size_to_read],
            );

            offset_in_block = 0;
            remaining_size -= size_to_read;

            if remaining_size == 0 {
                break;
            }
        }

        Ok(())
    }

    fn create_partition_reader(&self, partition_index: u64) -> Result<R, Error> {
        match partition_index == 0 {
            true => self
                .provider
                .create_reader_for_file(&format!("{}.ucas", self.file_name)),
            false => self
                .provider
                .create_reader_for_file(&format!("{}_s{}.ucas", self.file_name, partition_index)),
        }
    }
}
