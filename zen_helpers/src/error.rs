//! FString errors

use std::io;

use thiserror::Error;

/// Thrown when an FString read/write failed
#[derive(Error, Debug)]
pub enum FStringError {
    /// The FString has an invalid length
    #[error("Invalid string length {0} at position {1}")]
    InvalidStringSize(i32, u64),
    /// The FString is not in the expected encoding
    #[error("Invalid string encoding, expected {0}")]
    InvalidEncoding(Box<str>),
    /// An `std::io::Error` occured
    #[error(transparent)]
    Io(#[from] io::Error),
}
