//! All errors thrown by zen_asset

use std::io;
use std::string::{FromUtf16Error, FromUtf8Error};

use num_enum::{TryFromPrimitive, TryFromPrimitiveError};
use thiserror::Error;
use zen_helpers::error::FStringError;

/// Thrown when a serialized name batch failed to decode
#[derive(Error, Debug)]
pub enum NameBatchError {
    /// The hash algorithm tag was not the CityHash64-lowercase tag
    #[error("Unknown name batch hash algorithm: {0:#x}")]
    InvalidAlgorithm(u64),
    /// Declared string-bytes total doesn't match the decoded lengths
    #[error("Name batch length mismatch, declared: {0}, decoded: {1}")]
    LengthMismatch(u64, u64),
    /// A stored name hash doesn't match the recomputed hash
    #[error("Name batch hash mismatch, expected {0:#x}, got {1:#x}, string {2}")]
    HashMismatch(u64, u64, Box<str>),
}

/// Thrown when reading an IoStore container failed
#[derive(Error, Debug)]
pub enum ContainerError {
    /// Invalid toc magic
    #[error("Invalid .utoc magic, got: {0:?}")]
    InvalidTocMagic([u8; 16]),
    /// Invalid toc header size
    #[error("Invalid .utoc header size, expected: {0}, got: {1}")]
    InvalidTocHeaderSize(u32, u32),
    /// Invalid enum value
    #[error("{0}")]
    InvalidEnumValue(Box<str>),
    /// Tried to read a non-existent container partition file
    #[error("Tried to get a non-existent file {0}")]
    NoFile(Box<str>),
    /// Tried to get a non-existent IoStore chunk
    #[error("Chunk {0} doesn't exist")]
    NoChunk(Box<str>),

    /// No encryption key was provided for an encrypted container
    #[error("No encryption key was provided for an encrypted container")]
    NoEncryptionKey,

    /// An `std::io::Error` occured
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ContainerError {
    /// Create a `ContainerError` for a missing chunk
    pub fn no_chunk(name: &str) -> Self {
        ContainerError::NoChunk(name.to_string().into_boxed_str())
    }

    /// Create a `ContainerError` for a missing partition file
    pub fn no_file(name: &str) -> Self {
        ContainerError::NoFile(name.to_string().into_boxed_str())
    }
}

impl<T: TryFromPrimitive> From<TryFromPrimitiveError<T>> for ContainerError {
    fn from(e: TryFromPrimitiveError<T>) -> Self {
        ContainerError::InvalidEnumValue(e.to_string().into_boxed_str())
    }
}

/// Error type
#[derive(Error, Debug)]
pub enum Error {
    /// An `std::io::Error` occured, including EOF on a severed source/sink
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An `FStringError` occured
    #[error(transparent)]
    FString(#[from] FStringError),
    /// A `FromUtf8Error` occured
    #[error(transparent)]
    Utf8(#[from] FromUtf8Error),
    /// A `FromUtf16Error` occured
    #[error(transparent)]
    Utf16(#[from] FromUtf16Error),
    /// Expected data was not found
    #[error("{0}")]
    NoData(Box<str>),
    /// An offset, size or count is inconsistent with the stream
    #[error("{0}")]
    MalformedInput(Box<str>),
    /// A version field is outside the supported band
    #[error("{0}")]
    UnsupportedVersion(Box<str>),
    /// A payload accessor was used on the wrong package object index kind
    #[error("Wrong package object index kind, expected {0}, got {1}")]
    WrongIndexKind(Box<str>, Box<str>),
    /// An import could not be resolved
    #[error("{0}")]
    UnresolvedReference(Box<str>),
    /// A class-specific payload re-serialization rejected its input
    #[error("{0}")]
    PayloadRewriteFailed(Box<str>),
    /// A class-specific re-serialization size delta disagreed between passes
    #[error("Class-specific rewrite size mismatch, expected {0}, got {1}")]
    ClassSpecificRewriteMismatch(u64, u64),
    /// A lazy lookup missed and the caller asked to fail rather than load
    #[error("{0}")]
    CacheMiss(Box<str>),
    /// An enum value is invalid
    #[error("{0}")]
    InvalidEnumValue(Box<str>),
    /// A `NameBatchError` occured
    #[error(transparent)]
    NameBatch(#[from] NameBatchError),
    /// A `ContainerError` occured
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Tried to decompress data with an unknown compression method
    #[error("Unknown compression method {0}")]
    UnknownCompressionMethod(Box<str>),
    /// An LZ4 decompression error occured
    #[error(transparent)]
    Lz4(#[from] lz4_flex::block::DecompressError),
    /// Oodle decompression failed or is unavailable
    #[error("Oodle decompression is not available")]
    Oodle,
}

impl Error {
    /// Create an `Error` for a case where expected data was not found
    pub fn no_data(msg: String) -> Self {
        Error::NoData(msg.into_boxed_str())
    }

    /// Create an `Error` for an inconsistent offset, size or count
    pub fn malformed(msg: String) -> Self {
        Error::MalformedInput(msg.into_boxed_str())
    }

    /// Create an `Error` for an unsupported version field
    pub fn unsupported_version(msg: String) -> Self {
        Error::UnsupportedVersion(msg.into_boxed_str())
    }

    /// Create an `Error` for a wrong package object index kind
    pub fn wrong_index_kind(expected: &str, got: &str) -> Self {
        Error::WrongIndexKind(
            expected.to_string().into_boxed_str(),
            got.to_string().into_boxed_str(),
        )
    }

    /// Create an `Error` for an unresolvable import
    pub fn unresolved(msg: String) -> Self {
        Error::UnresolvedReference(msg.into_boxed_str())
    }

    /// Create an `Error` for a rejected class-specific payload rewrite
    pub fn payload_rewrite(msg: String) -> Self {
        Error::PayloadRewriteFailed(msg.into_boxed_str())
    }

    /// Create an `Error` for a failed lazy lookup
    pub fn cache_miss(msg: String) -> Self {
        Error::CacheMiss(msg.into_boxed_str())
    }
}

impl<T: TryFromPrimitive> From<TryFromPrimitiveError<T>> for Error {
    fn from(e: TryFromPrimitiveError<T>) -> Self {
        Error::InvalidEnumValue(e.to_string().into_boxed_str())
    }
}
