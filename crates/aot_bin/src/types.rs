//! Base types for structure of BIN file.

use std::fmt;
use std::io::{Read, Write};

use binrw::{BinRead, BinWrite, Endian};
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{FormatError, Result};

/// Magic number of a standard archive when read in its own byte order
pub const STANDARD_MAGIC: u32 = 0x00077DF9;

/// Magic number of a DLC archive when read in its own byte order
pub const DLC_MAGIC: u32 = 0x00000064;

/// Size of the header shared by both variants
pub const HEADER_SIZE: usize = 0x10;

/// Size of a single standard directory row
pub const RECORD_SIZE: usize = 0x10;

/// Block size used when none is requested
pub const DEFAULT_BLOCK_SIZE: i32 = 0x800;

/// Start of the DLC offset table
pub const DLC_OFFSET_TABLE: usize = 0x10;

/// Start of the DLC size table
pub const DLC_SIZE_TABLE: usize = 0x90;

/// First byte after the DLC tables
pub const DLC_DATA_START: usize = 0x110;

/// Number of 4 byte slots in each DLC table
pub const DLC_MAX_ENTRIES: usize = (DLC_SIZE_TABLE - DLC_OFFSET_TABLE) / 4;

/// Container layout of a BIN archive
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum ArchiveVariant {
    /// Block aligned archive with a 16 byte directory row per entry
    #[default]
    Standard,

    /// Small archive with fixed offset and size tables and no compression
    Dlc,
}

impl ArchiveVariant {
    /// Magic number identifying this variant
    pub const fn magic(self) -> u32 {
        match self {
            ArchiveVariant::Standard => STANDARD_MAGIC,
            ArchiveVariant::Dlc => DLC_MAGIC,
        }
    }

    /// Resolve the variant and byte order from the first four bytes of an archive.
    ///
    /// The prefix is read as big endian; a match means a big endian archive, a match
    /// against the byte-reversed magic means a little endian one.
    pub fn probe(prefix: [u8; 4]) -> Result<(ArchiveVariant, Endian)> {
        let magic = u32::from_be_bytes(prefix);
        [ArchiveVariant::Standard, ArchiveVariant::Dlc]
            .into_iter()
            .find_map(|variant| {
                if magic == variant.magic() {
                    Some((variant, Endian::Big))
                } else if magic == variant.magic().swap_bytes() {
                    Some((variant, Endian::Little))
                } else {
                    None
                }
            })
            .ok_or_else(|| FormatError::UnrecognizedMagic(magic).into())
    }
}

impl fmt::Display for ArchiveVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveVariant::Standard => write!(f, "standard"),
            ArchiveVariant::Dlc => write!(f, "dlc"),
        }
    }
}

/// BIN file header
///
/// Shared by both variants. The byte order is not fixed and must be supplied when
/// reading or writing, see [`ArchiveVariant::probe`].
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct BinHeader {
    /// The magic number identifying the variant
    pub magic: u32,

    /// The number of entries stored in the file
    pub file_count: i32,

    /// Alignment unit for entry data, zero for DLC archives
    pub block_size: i32,

    /// Unused
    pub padding: i32,
}

/// Standard directory row
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
pub struct BinRecord {
    /// Offset of the entry data divided by the block size
    pub block_index: i64,

    /// Number of bytes stored in the archive for this entry
    pub stored_size: i32,

    /// Inflated size as read in the archive byte order.
    ///
    /// Zero for uncompressed entries and overloaded with sentinel values, see
    /// [`crate::kind::EntryKind::classify`].
    pub inflated_size: u32,
}

/// The byte order opposite to `endian`
pub const fn opposite(endian: Endian) -> Endian {
    match endian {
        Endian::Big => Endian::Little,
        Endian::Little => Endian::Big,
    }
}

pub(crate) fn read_i32<R: Read>(reader: &mut R, endian: Endian) -> std::io::Result<i32> {
    match endian {
        Endian::Big => reader.read_i32::<BigEndian>(),
        Endian::Little => reader.read_i32::<LittleEndian>(),
    }
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, value: i32, endian: Endian) -> std::io::Result<()> {
    match endian {
        Endian::Big => writer.write_i32::<BigEndian>(value),
        Endian::Little => writer.write_i32::<LittleEndian>(value),
    }
}

/// Overwrite the first four bytes of `buf` with `value`
pub(crate) fn patch_i32(buf: &mut [u8], value: i32, endian: Endian) {
    match endian {
        Endian::Big => BigEndian::write_i32(buf, value),
        Endian::Little => LittleEndian::write_i32(buf, value),
    }
}

/// Round `value` up to the next multiple of `alignment`
pub(crate) const fn align(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite, Endian};
    use pretty_assertions::assert_eq;

    use crate::error::{Error, FormatError, Result};
    use crate::types::{align, opposite, ArchiveVariant, BinHeader, BinRecord, STANDARD_MAGIC};

    #[test]
    fn probe_big_endian_magic() -> Result<()> {
        let probed = ArchiveVariant::probe([0x00, 0x07, 0x7D, 0xF9])?;
        assert_eq!(probed, (ArchiveVariant::Standard, Endian::Big));
        Ok(())
    }

    #[test]
    fn probe_little_endian_magic() -> Result<()> {
        let probed = ArchiveVariant::probe([0xF9, 0x7D, 0x07, 0x00])?;
        assert_eq!(probed, (ArchiveVariant::Standard, Endian::Little));
        Ok(())
    }

    #[test]
    fn probe_dlc_magic() -> Result<()> {
        assert_eq!(
            ArchiveVariant::probe([0x00, 0x00, 0x00, 0x64])?,
            (ArchiveVariant::Dlc, Endian::Big)
        );
        assert_eq!(
            ArchiveVariant::probe([0x64, 0x00, 0x00, 0x00])?,
            (ArchiveVariant::Dlc, Endian::Little)
        );
        Ok(())
    }

    #[test]
    fn probe_unknown_magic() {
        let result = ArchiveVariant::probe([0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            result,
            Err(Error::InvalidArchive(FormatError::UnrecognizedMagic(0)))
        ));
    }

    #[test]
    fn read_little_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0xF9, 0x7D, 0x07, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x00, 0x08, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);

        let expected = BinHeader {
            magic: STANDARD_MAGIC,
            file_count: 2,
            block_size: 0x800,
            ..Default::default()
        };

        assert_eq!(BinHeader::read_options(&mut input, Endian::Little, ())?, expected);

        Ok(())
    }

    #[test]
    fn write_big_endian_header() -> Result<()> {
        #[rustfmt::skip]
        let expected: Vec<u8> = vec![
            0x00, 0x07, 0x7D, 0xF9,
            0x00, 0x00, 0x00, 0x02,
            0x00, 0x00, 0x08, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let header = BinHeader {
            magic: STANDARD_MAGIC,
            file_count: 2,
            block_size: 0x800,
            ..Default::default()
        };

        let mut actual = Vec::new();
        header.write_options(&mut Cursor::new(&mut actual), Endian::Big, ())?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn read_big_endian_record() -> Result<()> {
        #[rustfmt::skip]
        let mut input = Cursor::new(vec![
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x00,
        ]);

        let expected = BinRecord {
            block_index: 1,
            stored_size: 0x10,
            inflated_size: 0,
        };

        assert_eq!(BinRecord::read_options(&mut input, Endian::Big, ())?, expected);

        Ok(())
    }

    #[test]
    fn write_little_endian_record() -> Result<()> {
        #[rustfmt::skip]
        let expected = vec![
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x48, 0x1A, 0x00, 0x00,
            0x00, 0x00, 0x29, 0x10,
        ];

        let record = BinRecord {
            block_index: 3,
            stored_size: 0x1A48,
            inflated_size: 0x10290000,
        };

        let mut actual = Vec::new();
        record.write_options(&mut Cursor::new(&mut actual), Endian::Little, ())?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn opposite_flips_order() {
        assert_eq!(opposite(Endian::Big), Endian::Little);
        assert_eq!(opposite(Endian::Little), Endian::Big);
    }

    #[test]
    fn align_to_block() {
        assert_eq!(align(0, 0x800), 0);
        assert_eq!(align(0x20, 0x800), 0x800);
        assert_eq!(align(0x800, 0x800), 0x800);
        assert_eq!(align(0x801, 0x800), 0x1000);
    }
}
