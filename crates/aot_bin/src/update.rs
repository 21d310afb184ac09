//! Replacing entry content in a decoded tree
//!
//! Updates only touch the tree. The archive is rebuilt afterwards by passing the whole
//! tree to the writer, which recompresses every compressed entry whose content is no
//! longer packed.

use std::collections::HashMap;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, instrument, warn};

use crate::error::FileNotFoundError;
use crate::tree::{normalize, Directory};

/// Outcome of an [`update`] batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Normalized paths whose content was replaced, in request order
    pub updated: Vec<String>,

    /// Requested paths with no matching entry
    pub missing: Vec<FileNotFoundError>,
}

impl UpdateReport {
    /// Whether every requested path was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Replace the content of the entries at the given paths.
///
/// Paths are normalized before lookup and the last change wins when one path appears
/// more than once. Paths with no matching entry are reported rather than failing the
/// batch. See [`crate::tree::Entry::replace`] for how each kind takes new content.
#[instrument(skip_all, fields(entries = root.len()))]
pub fn update<I, P>(root: &mut Directory, changes: I) -> UpdateReport
where
    I: IntoIterator<Item = (P, Vec<u8>)>,
    P: AsRef<str>,
{
    let changes = changes
        .into_iter()
        .map(|(path, data)| (normalize(path.as_ref()), data))
        .collect::<IndexMap<_, _>>();

    let mut report = UpdateReport::default();

    let mut targets = Vec::with_capacity(changes.len());
    let mut files = root.files_mut().into_iter().collect::<HashMap<_, _>>();
    for (path, data) in changes {
        match files.remove(&path) {
            Some(entry) => {
                report.updated.push(path);
                targets.push((entry, data));
            }
            None => {
                warn!(%path, "no entry to update");
                report.missing.push(FileNotFoundError::Name(path));
            }
        }
    }

    targets.into_par_iter().for_each(|(entry, data)| {
        debug!(index = entry.index(), size = data.len(), "replacing entry content");
        entry.replace(data);
    });

    report
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{FileNotFoundError, Result};
    use crate::kind::EntryKind;
    use crate::read::BinArchive;
    use crate::tree::{Directory, Entry};
    use crate::update::update;
    use crate::write::{encode, BinWriterOptions};

    fn tree() -> Result<Directory> {
        let mut root = Directory::new();
        root.insert("data/normal.bin", Entry::new(EntryKind::Normal, 1, vec![1; 0x20]))?;
        root.insert("data/packed.bin", Entry::new(EntryKind::Compressed, 2, vec![2; 0x40]))?;
        root.insert("empty.bin", Entry::new(EntryKind::Empty, 3, vec![]))?;
        Ok(root)
    }

    #[traced_test]
    #[test]
    fn missing_paths_are_reported() -> Result<()> {
        let mut root = tree()?;
        let report = update(
            &mut root,
            [("data/normal.bin", vec![9]), ("data/unknown.bin", vec![8])],
        );

        assert_eq!(report.updated, vec!["data/normal.bin".to_string()]);
        assert_eq!(
            report.missing,
            vec![FileNotFoundError::Name("data/unknown.bin".into())]
        );
        assert!(!report.is_complete());
        assert!(logs_contain("no entry to update"));

        Ok(())
    }

    #[test]
    fn compressed_entries_keep_their_kind() -> Result<()> {
        let mut root = tree()?;
        let report = update(&mut root, [("\\data\\packed.bin", vec![7; 5])]);
        assert!(report.is_complete());

        let entry = root.get("data/packed.bin").ok_or(FileNotFoundError::Index(2))?;
        assert_eq!(entry.kind(), EntryKind::Compressed);
        assert_eq!(entry.inflated_size(), 5);
        assert_eq!(entry.data(), &[7; 5]);

        Ok(())
    }

    #[test]
    fn empty_entries_become_normal() -> Result<()> {
        let mut root = tree()?;
        update(&mut root, [("empty.bin", vec![3; 2])]);

        let entry = root.get("empty.bin").ok_or(FileNotFoundError::Index(3))?;
        assert_eq!(entry.kind(), EntryKind::Normal);
        assert_eq!(entry.index(), 3);

        Ok(())
    }

    #[test]
    fn last_change_wins() -> Result<()> {
        let mut root = tree()?;
        let report = update(
            &mut root,
            [("data/normal.bin", vec![1]), ("/data//normal.bin", vec![2])],
        );

        assert_eq!(report.updated.len(), 1);
        assert_eq!(root.get("data/normal.bin").map(Entry::data), Some(&[2u8][..]));

        Ok(())
    }

    #[test]
    fn shorter_normal_entry_is_rewritten() -> Result<()> {
        let options = BinWriterOptions::builder().block_size(0x20).build();
        let source = encode(&tree()?, options)?;

        let mut archive = BinArchive::with_names(
            &source,
            &["data/normal.bin", "data/packed.bin", "empty.bin"],
        )?;
        archive.decompress()?;
        let options = archive.writer_options();

        update(archive.root_mut(), [("data/normal.bin", vec![0xCD; 6])]);
        let rebuilt = encode(archive.root(), options)?;

        // Stored size of the first row
        assert_eq!(&rebuilt[0x18..0x1C], &[6, 0, 0, 0]);

        let archive = BinArchive::new(&rebuilt)?;
        let entry = archive.by_index(1)?;
        assert_eq!(entry.kind(), EntryKind::Normal);
        assert_eq!(entry.data(), &[0xCD; 6]);

        Ok(())
    }
}
