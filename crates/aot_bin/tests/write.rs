use std::io::Cursor;

use aot_bin::{
    error::{Error, Result},
    kind::DUMMY_PAYLOAD,
    ArchiveVariant, BinArchive, BinWriter, BinWriterOptions, Directory, Endian, Entry, EntryKind,
};
use pretty_assertions::assert_eq;
use tracing::{info, instrument};
use tracing_test::traced_test;

fn sample(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn mixed_tree() -> Result<Directory> {
    let mut root = Directory::new();
    root.insert("ui/title.g1t", Entry::new(EntryKind::Compressed, 3, sample(0x12345, 1)))?;
    root.insert("ui/blank", Entry::new(EntryKind::Empty, 1, vec![]))?;
    root.insert("snd/voice.kvs", Entry::new(EntryKind::Normal, 2, sample(0x801, 2)))?;
    root.insert("dummy", Entry::new(EntryKind::Dummy, 4, vec![]))?;
    root.insert("chr/eren.g1m", Entry::new(EntryKind::Compressed, 5, sample(0x10, 3)))?;
    Ok(root)
}

#[instrument(skip(root))]
fn validate_round_trip(root: &Directory, options: BinWriterOptions) -> Result<()> {
    let written = BinWriter::new(Cursor::new(Vec::new()), options)
        .write(root)?
        .into_inner();
    info!(size = written.len(), "wrote archive");

    if options.variant == ArchiveVariant::Standard && options.pad_tail {
        assert_eq!(written.len() % options.block_size as usize, 0);
    }

    let mut archive = BinArchive::new(&written)?;
    assert_eq!(archive.variant(), options.variant);
    assert_eq!(archive.endian(), options.endian);
    assert_eq!(archive.len(), root.len());

    archive.decompress()?;

    for (path, expected) in root.files() {
        info!(%path, "comparing");
        let actual = archive.by_index(expected.index())?;

        assert_eq!(actual.kind(), expected.kind());
        assert_eq!(actual.data(), expected.data());
    }

    // Decoding then encoding with the mirrored options reproduces the archive
    let archive = BinArchive::new(&written)?;
    assert_eq!(aot_bin::encode(archive.root(), archive.writer_options())?, written);

    Ok(())
}

#[traced_test]
#[test]
fn standard_round_trip() -> Result<()> {
    let root = mixed_tree()?;

    for endian in [Endian::Little, Endian::Big] {
        for block_size in [0x10, 0x800] {
            validate_round_trip(
                &root,
                BinWriterOptions::builder()
                    .endian(endian)
                    .block_size(block_size)
                    .build(),
            )?;
        }
    }

    Ok(())
}

#[traced_test]
#[test]
fn dlc_round_trip() -> Result<()> {
    let mut root = Directory::new();
    for index in 1..=32 {
        let kind = if index % 5 == 0 {
            EntryKind::Empty
        } else {
            EntryKind::Normal
        };
        root.insert(
            &format!("dlc/{index:02}.bin"),
            Entry::new(kind, index, sample(index as usize * 3, index as u8)),
        )?;
    }

    for endian in [Endian::Little, Endian::Big] {
        validate_round_trip(
            &root,
            BinWriterOptions::builder()
                .variant(ArchiveVariant::Dlc)
                .endian(endian)
                .build(),
        )?;
    }

    root.insert("dlc/33.bin", Entry::new(EntryKind::Normal, 33, vec![0]))?;
    assert!(matches!(
        aot_bin::encode(
            &root,
            BinWriterOptions::builder().variant(ArchiveVariant::Dlc).build()
        ),
        Err(Error::InvalidArchive(_))
    ));

    Ok(())
}

#[test]
fn default_layout() -> Result<()> {
    let data = aot_bin::encode(&mixed_tree()?, BinWriterOptions::default())?;

    #[rustfmt::skip]
    let header: [u8; 0x10] = [
        0xF9, 0x7D, 0x07, 0x00,
        0x05, 0x00, 0x00, 0x00,
        0x00, 0x08, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];
    assert_eq!(&data[..0x10], &header);

    let archive = BinArchive::new(&data)?;
    assert_eq!(archive.block_size(), 0x800);
    assert_eq!(archive.by_index(4)?.data(), &DUMMY_PAYLOAD[..]);

    Ok(())
}

#[test]
fn update_then_rebuild() -> Result<()> {
    let source = aot_bin::encode(&mixed_tree()?, BinWriterOptions::default())?;

    let mut archive = BinArchive::with_names(
        &source,
        &["ui/blank", "snd/voice.kvs", "ui/title.g1t", "dummy", "chr/eren.g1m"],
    )?;
    archive.decompress()?;
    let options = archive.writer_options();

    let report = aot_bin::update(
        archive.root_mut(),
        [
            ("ui/title.g1t", b"new title".to_vec()),
            ("snd/voice.kvs", vec![0xEE; 3]),
            ("snd/missing.kvs", vec![]),
        ],
    );
    assert_eq!(report.updated.len(), 2);
    assert_eq!(report.missing.len(), 1);

    let rebuilt = aot_bin::encode(archive.root(), options)?;
    let mut archive = BinArchive::new(&rebuilt)?;
    archive.decompress()?;

    assert_eq!(archive.len(), 5);
    assert_eq!(archive.by_index(2)?.data(), &[0xEE; 3]);
    assert_eq!(archive.by_index(3)?.kind(), EntryKind::Compressed);
    assert_eq!(archive.by_index(3)?.data(), b"new title");
    assert_eq!(archive.by_index(5)?.data(), &sample(0x10, 3)[..]);

    Ok(())
}
