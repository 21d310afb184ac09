//! This library handles reading from and creating **BIN** archives used by *Attack on Titan* (2016).
//!
//! # BIN Archive Format Documentation
//!
//! A BIN archive packs the game's assets into a single file with no names, only a positional
//! directory. Two container variants exist, each identified by its magic number. The byte
//! order of an archive is not fixed: the magic is read as big endian and compared with the
//! expected value and with its byte reversal, which selects big or little endian for every
//! other field of the archive.
//!
//! ## Header
//!
//! Both variants start with the same 16 byte header.
//!
//! | Offset (bytes) | Field        | Description                                           |
//! |----------------|--------------|-------------------------------------------------------|
//! | 0x0000         | Magic number | 4 bytes: `0x00077DF9` (standard) or `0x00000064` (DLC) |
//! | 0x0004         | File count   | 4 bytes: Number of entries in the archive             |
//! | 0x0008         | Block size   | 4 bytes: Alignment of entry data, `0` for DLC         |
//! | 0x000C         | Padding      | 4 bytes: Unused                                       |
//!
//! ## Standard Variant
//!
//! The header is followed by one 16 byte row per entry:
//!
//! | Offset (bytes) | Field         | Description                                            |
//! |----------------|---------------|--------------------------------------------------------|
//! | 0x0000         | Block index   | 8 bytes: Entry offset divided by the block size        |
//! | 0x0008         | Stored size   | 4 bytes: Number of bytes stored for the entry          |
//! | 0x000C         | Inflated size | 4 bytes: Inflated size, `0` when stored uncompressed   |
//!
//! The directory is padded to a block boundary and every entry starts on a block boundary.
//! Entries carry no explicit type; the stored and inflated sizes are read together to
//! classify them, see [`EntryKind::classify`].
//!
//! ### Compressed Entries
//!
//! Compressed entries are stored as a chunk stream: the inflated size, then a series of
//! length prefixed zlib streams of at most `0x8000` input bytes each, then a zero length.
//! See [`chunk`] for details. A couple of PS3 entries frame their chunk stream, and their
//! inflated size field, in the byte order opposite to the rest of the archive.
//!
//! ## DLC Variant
//!
//! | Offset (bytes) | Field        | Description                                     |
//! |----------------|--------------|-------------------------------------------------|
//! | 0x0000         | Header       | 16 bytes: See above                             |
//! | 0x0010         | Offset table | 128 bytes: 32 entry offsets from file start     |
//! | 0x0090         | Size table   | 128 bytes: 32 entry sizes                       |
//! | 0x0110         | Data         | Entry data                                      |
//!
//! DLC entries are never compressed.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.bin`
//! - **Endianness**: Little endian on PC, big endian on PS3
//! - **Compression Methods**: Zlib, framed in chunks
//!

pub mod chunk;
pub mod error;
pub mod kind;
pub mod read;
pub mod tree;
pub mod types;
pub mod update;
pub mod write;

pub use binrw::Endian;
pub use kind::EntryKind;
pub use read::BinArchive;
pub use tree::{Directory, Entry, Node};
pub use types::ArchiveVariant;
pub use update::{update, UpdateReport};
pub use write::{encode, BinWriter, BinWriterOptions};
