//! Entry classification.
//!
//! A standard directory row carries no explicit type. Its stored size and declared
//! inflated size are read together to decide how the entry content is framed, and
//! that decision is kept as an [`EntryKind`] for the rest of the entry's life.

use std::fmt;
use std::str::FromStr;

use binrw::Endian;

use crate::error::Error;
use crate::types::opposite;

/// Stored size of the fixed placeholder entry found in PS3 archives
pub const DUMMY_STORED_SIZE: i32 = 0x70;

/// Inflated size sentinel marking the fixed placeholder entry
pub const DUMMY_INFLATED_SIZE: u32 = 0x835F837E;

/// Content of the fixed placeholder entry
#[rustfmt::skip]
pub const DUMMY_PAYLOAD: [u8; DUMMY_STORED_SIZE as usize] = [
    0x83, 0x5F, 0x83, 0x7E, 0x81, 0x5B, 0x82, 0xC5, 0x82, 0xB7, 0x2E, 0x0D, 0x0A, 0x90, 0xB3, 0x8E,
    0xAE, 0x82, 0xC8, 0x83, 0x66, 0x81, 0x5B, 0x83, 0x5E, 0x82, 0xAA, 0x93, 0xFC, 0x82, 0xE9, 0x82,
    0xDC, 0x82, 0xC5, 0x81, 0x41, 0x82, 0xD0, 0x82, 0xC6, 0x82, 0xDC, 0x82, 0xB8, 0x83, 0x8A, 0x83,
    0x93, 0x83, 0x4E, 0x83, 0x66, 0x81, 0x5B, 0x83, 0x5E, 0x82, 0xF0, 0x8D, 0xEC, 0x90, 0xAC, 0x82,
    0xB7, 0x82, 0xE9, 0x82, 0xBD, 0x82, 0xDF, 0x82, 0xCC, 0x83, 0x5F, 0x83, 0x7E, 0x81, 0x5B, 0x83,
    0x74, 0x83, 0x40, 0x83, 0x43, 0x83, 0x8B, 0x82, 0xC6, 0x82, 0xB5, 0x82, 0xC4, 0x8D, 0xEC, 0x90,
    0xAC, 0x82, 0xB3, 0x82, 0xEA, 0x82, 0xC4, 0x82, 0xA2, 0x82, 0xDC, 0x82, 0xB7, 0x2E, 0x0D, 0x0A,
];

/// `(stored size, inflated size)` pairs of PS3 entries whose chunk stream uses the
/// byte order opposite to the archive.
///
/// This list is closed. Only rows matching one of these pairs exactly are treated as
/// alternate endian.
const ALTERNATE_ENDIAN_ROWS: [(i32, u32); 2] = [(0x1A48, 0x10290000), (0x1681, 0xBC4B0000)];

/// How an entry's content is stored inside the archive
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "&'static str", try_from = "String")
)]
pub enum EntryKind {
    /// Zero length entry with no data
    Empty,

    /// Content stored verbatim
    Normal,

    /// Content stored as a chunk stream in the archive byte order
    Compressed,

    /// Content stored as a chunk stream in the opposite byte order
    CompressedAlternateEndian,

    /// Fixed placeholder content, see [`DUMMY_PAYLOAD`]
    Dummy,
}

impl EntryKind {
    /// Classify a directory row.
    ///
    /// `inflated_size` is the raw field value as read in the archive byte order.
    ///
    /// | stored size | inflated size | kind |
    /// |---|---|---|
    /// | 0 | any | [`EntryKind::Empty`] |
    /// | 0x70 | 0x835F837E | [`EntryKind::Dummy`] |
    /// | any | 0 | [`EntryKind::Normal`] |
    /// | 0x1A48 | 0x10290000 | [`EntryKind::CompressedAlternateEndian`] |
    /// | 0x1681 | 0xBC4B0000 | [`EntryKind::CompressedAlternateEndian`] |
    /// | other | nonzero | [`EntryKind::Compressed`] |
    pub fn classify(stored_size: i32, inflated_size: u32) -> EntryKind {
        match (stored_size, inflated_size) {
            (0, _) => EntryKind::Empty,
            (DUMMY_STORED_SIZE, DUMMY_INFLATED_SIZE) => EntryKind::Dummy,
            (_, 0) => EntryKind::Normal,
            row if ALTERNATE_ENDIAN_ROWS.contains(&row) => EntryKind::CompressedAlternateEndian,
            _ => EntryKind::Compressed,
        }
    }

    /// Whether entries of this kind hold a chunk stream
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            EntryKind::Compressed | EntryKind::CompressedAlternateEndian
        )
    }

    /// Byte order of the chunk stream and inflated size field for this kind
    pub const fn chunk_endian(self, archive: Endian) -> Endian {
        match self {
            EntryKind::CompressedAlternateEndian => opposite(archive),
            _ => archive,
        }
    }

    /// Name used when the kind is written as text
    pub const fn as_str(self) -> &'static str {
        match self {
            EntryKind::Empty => "Empty",
            EntryKind::Normal => "Normal",
            EntryKind::Compressed => "Compressed",
            EntryKind::CompressedAlternateEndian => "CompressedAlternateEndian",
            EntryKind::Dummy => "Dummy",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            EntryKind::Empty,
            EntryKind::Normal,
            EntryKind::Compressed,
            EntryKind::CompressedAlternateEndian,
            EntryKind::Dummy,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| Error::UnsupportedKind(s.to_owned()))
    }
}

impl From<EntryKind> for &'static str {
    fn from(kind: EntryKind) -> Self {
        kind.as_str()
    }
}

impl TryFrom<String> for EntryKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}
