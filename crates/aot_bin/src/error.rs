//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is an invalid bin archive
    #[error("file is an invalid bin archive")]
    InvalidArchive(#[from] FormatError),

    /// chunk stream inflated to {actual} bytes but declared {expected}
    #[error("chunk stream inflated to {actual} bytes but declared {expected}")]
    ChunkIntegrity {
        /// Length written in the chunk stream header
        expected: i64,
        /// Length actually produced by inflating every chunk
        actual: usize,
    },

    /// unsupported entry kind {0}
    #[error("unsupported entry kind {0}")]
    UnsupportedKind(String),

    /// unable to find requested file
    #[error("unable to find requested file {0}")]
    FileNotFound(#[from] FileNotFoundError),

    /// path {0} is empty or collides with an existing entry
    #[error("path {0:?} is empty or collides with an existing entry")]
    InvalidPath(String),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Error type describing why a byte buffer is not a usable BIN archive
#[derive(Error, Diagnostic, Debug, PartialEq)]
pub enum FormatError {
    /// archive is {len} bytes but at least {required} are needed
    #[error("archive is {len} bytes but at least {required} are needed")]
    TooShort { len: usize, required: usize },

    /// unrecognized magic number {0:#010X}
    #[error("unrecognized magic number {0:#010X}")]
    UnrecognizedMagic(u32),

    /// negative entry count {0}
    #[error("negative entry count {0}")]
    NegativeCount(i32),

    /// no entries to write
    #[error("no entries to write")]
    NoEntries,

    /// invalid block size {0}
    #[error("invalid block size {0}")]
    InvalidBlockSize(i32),

    /// entry {index} lies outside the archive
    #[error("entry {index} lies outside the archive")]
    EntryOutOfBounds { index: usize },

    /// entry {index} is too large to be stored
    #[error("entry {index} is too large to be stored")]
    EntryTooLarge { index: u32 },

    /// chunk at offset {offset} runs past the end of the stream
    #[error("chunk at offset {offset} runs past the end of the stream")]
    TruncatedChunk { offset: usize },

    /// {count} entries exceed the {max} slots available
    #[error("{count} entries exceed the {max} slots available")]
    TooManyEntries { count: usize, max: usize },

    /// expected entry index {expected}, found {found}
    #[error("expected entry index {expected}, found {found}")]
    IndexMismatch { expected: u32, found: u32 },
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(u32),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
