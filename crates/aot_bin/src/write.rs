//! Types for writing BIN archives
//!

use std::borrow::Cow;
use std::io::{self, Read, Write};

use binrw::{io::NoSeek, BinWrite, Endian};
use bon::Builder;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::{
    chunk,
    error::{Error, FormatError, Result},
    kind::{EntryKind, DUMMY_INFLATED_SIZE, DUMMY_PAYLOAD, DUMMY_STORED_SIZE},
    tree::{Directory, Entry, Payload},
    types::{
        align, ArchiveVariant, BinHeader, BinRecord, DEFAULT_BLOCK_SIZE, DLC_DATA_START,
        DLC_MAX_ENTRIES, HEADER_SIZE, RECORD_SIZE,
    },
};

/// Options for how the BIN file should be written
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct BinWriterOptions {
    /// The container layout to produce
    #[builder(default)]
    pub variant: ArchiveVariant,

    /// Byte order of the header, directory and chunk streams
    #[builder(default = Endian::Little)]
    pub endian: Endian,

    /// Alignment unit for entry data, ignored for DLC archives
    #[builder(default = DEFAULT_BLOCK_SIZE)]
    pub block_size: i32,

    /// Pad the last entry up to a block boundary as well
    #[builder(default = true)]
    pub pad_tail: bool,
}

impl Default for BinWriterOptions {
    fn default() -> Self {
        BinWriterOptions::builder().build()
    }
}

/// An entry framed for storage, waiting for its position in the archive
#[derive(Debug)]
struct EncodedEntry<'a> {
    stored_size: i32,
    /// Inflated size field as written in the archive byte order
    inflated_size: u32,
    payload: Cow<'a, [u8]>,
}

impl EncodedEntry<'_> {
    const EMPTY: EncodedEntry<'static> = EncodedEntry {
        stored_size: 0,
        inflated_size: 0,
        payload: Cow::Borrowed(&[]),
    };
}

/// BIN archive generator
///
/// Entries are written in index order, whatever their position in the tree.
///
/// ```
/// # fn doit() -> aot_bin::error::Result<()>
/// # {
/// use aot_bin::{BinWriter, BinWriterOptions, Directory, Entry, EntryKind};
///
/// let mut root = Directory::new();
/// root.insert("hello_world.txt", Entry::new(EntryKind::Normal, 1, b"Hello, World!".to_vec()))?;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let bin = BinWriter::new(std::io::Cursor::new(Vec::new()), BinWriterOptions::builder()
///            .block_size(0x20)
///            .build());
///
/// let buf = bin.write(&root)?.into_inner();
/// assert_eq!(buf.len(), 0x40);
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct BinWriter<W: Write> {
    inner: W,
    options: BinWriterOptions,
}

impl<W: Write> BinWriter<W> {
    /// Prepare a writer that will produce an archive into `inner`
    pub fn new(inner: W, options: BinWriterOptions) -> BinWriter<W> {
        BinWriter { inner, options }
    }

    /// Encode every entry below `root` and write the archive.
    ///
    /// Nothing is written unless every entry could be encoded. This will return the
    /// writer, but one should normally not append any data to the end of the file.
    #[instrument(skip_all, fields(variant = %self.options.variant, entries = root.len()), err)]
    pub fn write(mut self, root: &Directory) -> Result<W> {
        let entries = sorted_entries(root)?;
        let endian = self.options.endian;

        match self.options.variant {
            ArchiveVariant::Standard => {
                if self.options.block_size <= 0 {
                    return Err(FormatError::InvalidBlockSize(self.options.block_size).into());
                }
            }
            ArchiveVariant::Dlc => check_dlc(&entries)?,
        }

        let encoded = entries
            .par_iter()
            .map(|entry| encode_entry(entry, endian))
            .collect::<Result<Vec<_>>>()?;

        match self.options.variant {
            ArchiveVariant::Standard => self.write_standard(&encoded)?,
            ArchiveVariant::Dlc => self.write_dlc(&encoded)?,
        }

        self.inner.flush()?;

        Ok(self.inner)
    }

    fn write_standard(&mut self, encoded: &[EncodedEntry<'_>]) -> Result<()> {
        let endian = self.options.endian;
        let block_size = self.options.block_size as u64;

        let directory_end = (HEADER_SIZE + encoded.len() * RECORD_SIZE) as u64;
        let data_start = align(directory_end, block_size);

        // Lay out every entry before anything is written
        let mut records = Vec::with_capacity(encoded.len());
        let mut starts = Vec::with_capacity(encoded.len());
        let mut offset = data_start;
        for (i, entry) in encoded.iter().enumerate() {
            records.push(BinRecord {
                block_index: (offset / block_size) as i64,
                stored_size: entry.stored_size,
                inflated_size: entry.inflated_size,
            });
            starts.push(offset);

            offset += entry.payload.len() as u64;
            if self.options.pad_tail || i + 1 < encoded.len() {
                offset = align(offset, block_size);
            }
        }

        debug!(data_start, total = offset, "computed layout");

        // The layout is known up front, nothing needs to seek back
        let mut out = NoSeek::new(&mut self.inner);
        BinHeader {
            magic: ArchiveVariant::Standard.magic(),
            file_count: encoded.len() as i32,
            block_size: self.options.block_size,
            padding: 0,
        }
        .write_options(&mut out, endian, ())?;

        for record in &records {
            record.write_options(&mut out, endian, ())?;
        }

        let mut position = directory_end;
        for (entry, start) in encoded.iter().zip(starts) {
            write_zeros(&mut self.inner, start - position)?;
            self.inner.write_all(&entry.payload)?;
            position = start + entry.payload.len() as u64;
        }
        write_zeros(&mut self.inner, offset.max(data_start) - position)?;

        Ok(())
    }

    fn write_dlc(&mut self, encoded: &[EncodedEntry<'_>]) -> Result<()> {
        let endian = self.options.endian;

        let mut offsets = [0i32; DLC_MAX_ENTRIES];
        let mut sizes = [0i32; DLC_MAX_ENTRIES];
        let mut offset = DLC_DATA_START as u64;
        for (i, entry) in encoded.iter().enumerate() {
            offsets[i] = i32::try_from(offset).map_err(|_| FormatError::EntryTooLarge {
                index: i as u32 + 1,
            })?;
            sizes[i] = entry.stored_size;
            offset += entry.payload.len() as u64;
        }

        debug!(total = offset, "computed layout");

        BinHeader {
            magic: ArchiveVariant::Dlc.magic(),
            file_count: encoded.len() as i32,
            block_size: 0,
            padding: 0,
        }
        .write_options(&mut NoSeek::new(&mut self.inner), endian, ())?;

        offsets.write_options(&mut NoSeek::new(&mut self.inner), endian, ())?;
        sizes.write_options(&mut NoSeek::new(&mut self.inner), endian, ())?;

        for entry in encoded {
            self.inner.write_all(&entry.payload)?;
        }

        Ok(())
    }
}

/// Encode the tree below `root` into an in-memory archive
pub fn encode(root: &Directory, options: BinWriterOptions) -> Result<Vec<u8>> {
    BinWriter::new(Vec::new(), options).write(root)
}

/// Collect the entries below `root`, checking their indices run from 1 without gaps
fn sorted_entries(root: &Directory) -> Result<Vec<&Entry>> {
    let mut entries = root
        .files()
        .into_iter()
        .map(|(_, entry)| entry)
        .collect::<Vec<_>>();

    if entries.is_empty() {
        return Err(FormatError::NoEntries.into());
    }

    entries.sort_by_key(|entry| entry.index());
    for (i, entry) in entries.iter().enumerate() {
        let expected = i as u32 + 1;
        if entry.index() != expected {
            return Err(FormatError::IndexMismatch {
                expected,
                found: entry.index(),
            }
            .into());
        }
    }

    Ok(entries)
}

fn check_dlc(entries: &[&Entry]) -> Result<()> {
    if entries.len() > DLC_MAX_ENTRIES {
        return Err(FormatError::TooManyEntries {
            count: entries.len(),
            max: DLC_MAX_ENTRIES,
        }
        .into());
    }

    match entries
        .iter()
        .find(|entry| !matches!(entry.kind(), EntryKind::Normal | EntryKind::Empty))
    {
        Some(entry) => Err(Error::UnsupportedKind(entry.kind().to_string())),
        None => Ok(()),
    }
}

/// Frame a single entry for storage
fn encode_entry(entry: &Entry, endian: Endian) -> Result<EncodedEntry<'_>> {
    let too_large = || FormatError::EntryTooLarge {
        index: entry.index(),
    };

    let encoded = match (entry.kind(), entry.payload()) {
        (EntryKind::Empty, _) => EncodedEntry::EMPTY,
        (EntryKind::Dummy, _) => EncodedEntry {
            stored_size: DUMMY_STORED_SIZE,
            inflated_size: DUMMY_INFLATED_SIZE,
            payload: Cow::Borrowed(&DUMMY_PAYLOAD),
        },
        (EntryKind::Normal, _) => EncodedEntry {
            stored_size: i32::try_from(entry.data().len()).map_err(|_| too_large())?,
            inflated_size: 0,
            payload: Cow::Borrowed(entry.data()),
        },
        // Never inflated, written back exactly as it was read
        (kind, Payload::Packed(stored)) => EncodedEntry {
            stored_size: i32::try_from(stored.len()).map_err(|_| too_large())?,
            inflated_size: inflated_field(kind, entry.inflated_size()),
            payload: Cow::Borrowed(stored),
        },
        // A zero inflated size would read back as a Normal entry
        (_, Payload::Plain(data)) if data.is_empty() => EncodedEntry::EMPTY,
        (kind, Payload::Plain(data)) => {
            let inflated_size = u32::try_from(data.len()).map_err(|_| too_large())?;
            let framed = chunk::encode(data, kind.chunk_endian(endian))?;
            let stored_size = i32::try_from(framed.len()).map_err(|_| too_large())?;
            let field = inflated_field(kind, inflated_size);

            if kind == EntryKind::CompressedAlternateEndian
                && EntryKind::classify(stored_size, field) != kind
            {
                // Only the quirk rows read back as alternate endian
                warn!(
                    index = entry.index(),
                    stored = stored_size,
                    "alternate endian entry does not match a quirk row, written as Compressed"
                );

                let framed = chunk::encode(data, endian)?;
                EncodedEntry {
                    stored_size: i32::try_from(framed.len()).map_err(|_| too_large())?,
                    inflated_size,
                    payload: Cow::Owned(framed),
                }
            } else {
                EncodedEntry {
                    stored_size,
                    inflated_size: field,
                    payload: Cow::Owned(framed),
                }
            }
        }
    };

    debug!(
        index = entry.index(),
        kind = %entry.kind(),
        stored = encoded.stored_size,
        "encoded entry"
    );

    Ok(encoded)
}

/// The inflated size field value for `kind`, in the archive byte order
fn inflated_field(kind: EntryKind, inflated_size: u32) -> u32 {
    match kind {
        EntryKind::CompressedAlternateEndian => inflated_size.swap_bytes(),
        _ => inflated_size,
    }
}

fn write_zeros<W: Write>(writer: &mut W, count: u64) -> io::Result<()> {
    io::copy(&mut io::repeat(0).take(count), writer)?;
    Ok(())
}
