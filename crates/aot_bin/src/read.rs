//! Types for reading BIN archives
//!

use std::io::{Cursor, Read};

use binrw::{BinRead, Endian};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::{Error, FileNotFoundError, FormatError, Result},
    kind::EntryKind,
    tree::{Directory, Entry},
    types::{
        ArchiveVariant, BinHeader, BinRecord, DLC_DATA_START, DLC_MAX_ENTRIES, DLC_OFFSET_TABLE,
        DLC_SIZE_TABLE, HEADER_SIZE, RECORD_SIZE,
    },
    write::BinWriterOptions,
};

/// A directory row resolved to a byte range of the archive
#[derive(Debug, Clone, Copy, PartialEq)]
struct RawEntry {
    offset: u64,
    stored_size: i32,
    inflated_size: u32,
}

/// BIN archive reader
///
/// Decoding leaves compressed entries packed; call [`BinArchive::decompress`] to
/// inflate them.
///
/// ```no_run
/// fn list_bin_contents(data: &[u8]) -> aot_bin::error::Result<()> {
///     let mut archive = aot_bin::BinArchive::new(data)?;
///     archive.decompress()?;
///
///     for (path, entry) in archive.root().files() {
///         println!("{path}: {} ({} bytes)", entry.kind(), entry.data().len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct BinArchive {
    header: BinHeader,
    variant: ArchiveVariant,
    endian: Endian,
    source_len: usize,
    root: Directory,
}

impl BinArchive {
    /// Decode an archive, naming every entry after its 1-based index
    pub fn new(data: &[u8]) -> Result<BinArchive> {
        Self::with_names::<&str>(data, &[])
    }

    /// Decode an archive, naming entries from a list of `/` separated paths.
    ///
    /// `names[i]` names the entry in directory position `i`. Missing or empty names
    /// fall back to the zero padded index (`0001`, `0002`, ...).
    #[instrument(skip_all, fields(size = data.len(), names = names.len()), err)]
    pub fn with_names<S: AsRef<str>>(data: &[u8], names: &[S]) -> Result<BinArchive> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::TooShort {
                len: data.len(),
                required: HEADER_SIZE,
            }
            .into());
        }

        let (variant, endian) = ArchiveVariant::probe([data[0], data[1], data[2], data[3]])?;

        let mut reader = Cursor::new(data);
        let header = BinHeader::read_options(&mut reader, endian, ())?;
        let count = usize::try_from(header.file_count)
            .map_err(|_| FormatError::NegativeCount(header.file_count))?;

        debug!(%variant, ?endian, count, block_size = header.block_size, "read header");

        let rows = match variant {
            ArchiveVariant::Standard => {
                Self::get_standard_rows(&mut reader, endian, header.block_size, count)?
            }
            ArchiveVariant::Dlc => Self::get_dlc_rows(&mut reader, endian, count)?,
        };

        let mut root = Directory::new();
        for (i, row) in rows.into_iter().enumerate() {
            let index = i as u32 + 1;
            let entry = Self::get_entry(data, index, row)?;

            let path = names
                .get(i)
                .map(AsRef::as_ref)
                .filter(|name| !name.trim_matches('/').is_empty())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{index:04}"));
            root.insert(&path, entry)?;
        }

        Ok(BinArchive {
            header,
            variant,
            endian,
            source_len: data.len(),
            root,
        })
    }

    /// Read a whole archive from `reader` and decode it
    pub fn from_reader<R: Read, S: AsRef<str>>(mut reader: R, names: &[S]) -> Result<BinArchive> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::with_names(&data, names)
    }

    /// Inflate every packed entry
    pub fn decompress(&mut self) -> Result<()> {
        decompress(&mut self.root, self.endian)
    }

    /// Number of entries contained in this archive
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the container variant
    pub fn variant(&self) -> ArchiveVariant {
        self.variant
    }

    /// Returns the byte order resolved from the magic number
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Returns the block size, zero for DLC archives
    pub fn block_size(&self) -> i32 {
        self.header.block_size
    }

    /// Returns the decoded header
    pub fn header(&self) -> &BinHeader {
        &self.header
    }

    /// Get a reference to the entry tree
    pub fn root(&self) -> &Directory {
        &self.root
    }

    /// Get a mutable reference to the entry tree
    pub fn root_mut(&mut self) -> &mut Directory {
        &mut self.root
    }

    /// Unwrap and return the entry tree
    pub fn into_root(self) -> Directory {
        self.root
    }

    /// Search for an entry by its 1-based index
    pub fn by_index(&self, index: u32) -> Result<&Entry> {
        self.root
            .files()
            .into_iter()
            .find(|(_, entry)| entry.index() == index)
            .map(|(_, entry)| entry)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))
    }

    /// Writer options that reproduce the layout of this archive
    pub fn writer_options(&self) -> BinWriterOptions {
        let block_size = self.header.block_size;
        let pad_tail = match self.variant {
            ArchiveVariant::Standard if block_size > 0 => self.source_len % block_size as usize == 0,
            _ => true,
        };

        BinWriterOptions::builder()
            .variant(self.variant)
            .endian(self.endian)
            .block_size(block_size)
            .pad_tail(pad_tail)
            .build()
    }

    fn get_standard_rows(
        reader: &mut Cursor<&[u8]>,
        endian: Endian,
        block_size: i32,
        count: usize,
    ) -> Result<Vec<RawEntry>> {
        if count > 0 && block_size <= 0 {
            return Err(FormatError::InvalidBlockSize(block_size).into());
        }

        let len = reader.get_ref().len();
        let required = count
            .checked_mul(RECORD_SIZE)
            .and_then(|rows| rows.checked_add(HEADER_SIZE))
            .filter(|required| *required <= len)
            .ok_or(FormatError::TooShort {
                len,
                required: count.saturating_mul(RECORD_SIZE).saturating_add(HEADER_SIZE),
            })?;
        debug!(required, "directory fits archive");

        (0..count)
            .map(|i| {
                let record = BinRecord::read_options(reader, endian, ())?;
                let offset = record
                    .block_index
                    .checked_mul(block_size.into())
                    .and_then(|offset| u64::try_from(offset).ok())
                    .ok_or(FormatError::EntryOutOfBounds { index: i + 1 })?;

                Ok(RawEntry {
                    offset,
                    stored_size: record.stored_size,
                    inflated_size: record.inflated_size,
                })
            })
            .collect()
    }

    fn get_dlc_rows(
        reader: &mut Cursor<&[u8]>,
        endian: Endian,
        count: usize,
    ) -> Result<Vec<RawEntry>> {
        if count > DLC_MAX_ENTRIES {
            return Err(FormatError::TooManyEntries {
                count,
                max: DLC_MAX_ENTRIES,
            }
            .into());
        }

        let len = reader.get_ref().len();
        if len < DLC_DATA_START {
            return Err(FormatError::TooShort {
                len,
                required: DLC_DATA_START,
            }
            .into());
        }

        (0..count)
            .map(|i| {
                reader.set_position((DLC_OFFSET_TABLE + 4 * i) as u64);
                let offset = i32::read_options(reader, endian, ())?;
                reader.set_position((DLC_SIZE_TABLE + 4 * i) as u64);
                let stored_size = i32::read_options(reader, endian, ())?;

                Ok(RawEntry {
                    offset: u64::try_from(offset)
                        .map_err(|_| FormatError::EntryOutOfBounds { index: i + 1 })?,
                    stored_size,
                    inflated_size: 0,
                })
            })
            .collect()
    }

    fn get_entry(data: &[u8], index: u32, row: RawEntry) -> Result<Entry> {
        let kind = EntryKind::classify(row.stored_size, row.inflated_size);
        debug!(index, %kind, offset = row.offset, size = row.stored_size, "classified entry");

        if kind == EntryKind::Empty {
            return Ok(Entry::new(kind, index, Vec::new()));
        }

        let out_of_bounds = FormatError::EntryOutOfBounds {
            index: index as usize,
        };
        let stored = usize::try_from(row.offset)
            .ok()
            .zip(usize::try_from(row.stored_size).ok())
            .and_then(|(start, size)| data.get(start..start.checked_add(size)?))
            .ok_or(out_of_bounds)?
            .to_vec();

        Ok(match kind {
            EntryKind::Compressed => Entry::packed(kind, index, row.inflated_size, stored),
            // The inflated size of these rows was written in the opposite byte order.
            EntryKind::CompressedAlternateEndian => {
                Entry::packed(kind, index, row.inflated_size.swap_bytes(), stored)
            }
            _ => Entry::stored(kind, index, stored),
        })
    }
}

/// Inflate every packed entry below `root`.
///
/// `endian` is the byte order of the archive the entries were decoded from. Entries
/// are inflated in parallel; the first failure is returned.
#[instrument(skip(root), fields(entries = root.len()), err)]
pub fn decompress(root: &mut Directory, endian: Endian) -> Result<()> {
    root.files_mut()
        .into_par_iter()
        .filter(|(_, entry)| entry.is_packed())
        .try_for_each(|(path, entry)| {
            debug!(%path, kind = %entry.kind(), "inflating entry");
            entry.inflate(endian)
        })
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, FileNotFoundError, FormatError, Result};
    use crate::kind::EntryKind;
    use crate::read::BinArchive;
    use crate::types::ArchiveVariant;

    #[rustfmt::skip]
    const TWO_ENTRIES: [u8; 0x40] = [
        // Header
        0x00, 0x07, 0x7D, 0xF9, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00,
        // Directory
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // Data
        0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[traced_test]
    #[test]
    fn entries_by_index() -> Result<()> {
        let archive = BinArchive::new(&TWO_ENTRIES)?;

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(1)?.data(), &[0xCA, 0xFE, 0xBA, 0xBE]);
        assert_eq!(archive.by_index(2)?.kind(), EntryKind::Empty);
        assert!(matches!(
            archive.by_index(3),
            Err(Error::FileNotFound(FileNotFoundError::Index(3)))
        ));

        Ok(())
    }

    #[test]
    fn writer_options_mirror_source() -> Result<()> {
        let options = BinArchive::new(&TWO_ENTRIES)?.writer_options();

        assert_eq!(options.variant, ArchiveVariant::Standard);
        assert_eq!(options.endian, Endian::Big);
        assert_eq!(options.block_size, 0x10);
        assert!(options.pad_tail);

        let options = BinArchive::new(&TWO_ENTRIES[..0x34])?.writer_options();
        assert!(!options.pad_tail);

        Ok(())
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let mut data = TWO_ENTRIES;
        data[0x0B] = 0;

        assert!(matches!(
            BinArchive::new(&data),
            Err(Error::InvalidArchive(FormatError::InvalidBlockSize(0)))
        ));
    }

    #[test]
    fn dlc_table_must_be_present() {
        let mut data = vec![0u8; 0x20];
        data[..4].copy_from_slice(&[0x64, 0x00, 0x00, 0x00]);

        assert!(matches!(
            BinArchive::new(&data),
            Err(Error::InvalidArchive(FormatError::TooShort {
                len: 0x20,
                required: 0x110
            }))
        ));
    }
}
