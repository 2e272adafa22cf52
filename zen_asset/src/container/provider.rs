//! Container partition file providers
//!
//! These allow different `.ucas` reading strategies, e.g. files from a paks
//! directory on disk or in-memory buffers in tests.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;

use crate::error::{ContainerError, Error};

/// Container partition file provider trait
pub trait IoStoreProvider<R: Read + Seek> {
    /// Create a reader for a partition file with the given file name
    fn create_reader_for_file(&self, file_name: &str) -> Result<R, Error>;
}

/// File provider from a folder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IoStoreFileProvider {
    folder: PathBuf,
}

impl IoStoreFileProvider {
    /// Create a new `IoStoreFileProvider` instance
    pub fn new(folder: PathBuf) -> Self {
        IoStoreFileProvider { folder }
    }
}

impl IoStoreProvider<File> for IoStoreFileProvider {
    fn create_reader_for_file(&self, file_name: &str) -> Result<File, Error> {
        File::open(self.folder.join(file_name))
            .map_err(|_| ContainerError::no_file(file_name).into())
    }
}

/// File provider using in-memory data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoStoreMemoryProvider<'data> {
    mappings: HashMap<String, &'data [u8]>,
}

impl<'data> IoStoreMemoryProvider<'data> {
    /// Create a new `IoStoreMemoryProvider` instance
    pub fn new(mappings: HashMap<String, &'data [u8]>) -> Self {
        IoStoreMemoryProvider { mappings }
    }

    /// Add a new file mapping to this instance
    pub fn add_mapping(&mut self, name: &str, data: &'data [u8]) {
        self.mappings.insert(name.to_owned(), data);
    }
}

impl<'data> IoStoreProvider<Cursor<&'data [u8]>> for IoStoreMemoryProvider<'data> {
    fn create_reader_for_file(&self, file_name: &str) -> Result<Cursor<&'data [u8]>, Error> {
        if let Some(mapping) = self.mappings.get(file_name) {
            return Ok(Cursor::new(mapping));
        }

        Err(ContainerError::no_file(file_name).into())
    }
}
