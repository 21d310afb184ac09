use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Component, Path, PathBuf},
};

use aot_bin::{Directory, EntryKind};
use itertools::Itertools;
use miette::{miette, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

/// Name of the side-car file listing the extracted entries
pub const MANIFEST_NAME: &str = "fileInfo.json";

/// An extracted entry as recorded in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Path relative to the extraction directory, `/` separated
    pub name: String,

    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// 1-based position in the archive directory
    pub index: u32,
}

impl FileInfo {
    /// Describe every entry below `root`, ordered by index
    pub fn collect(root: &Directory) -> Vec<FileInfo> {
        root.files()
            .into_iter()
            .map(|(name, entry)| FileInfo {
                name,
                kind: entry.kind(),
                index: entry.index(),
            })
            .sorted_by_key(|info| info.index)
            .collect()
    }

    /// Location of this entry below `dir`.
    ///
    /// Every segment of the name must be a plain file or directory name, so the
    /// result never leaves `dir`.
    pub fn path_in(&self, dir: &Path) -> Result<PathBuf> {
        self.name
            .split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(dir.to_path_buf(), |path, segment| {
                let mut components = Path::new(segment).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => Ok(path.join(segment)),
                    _ => Err(miette!(
                        "entry name {} has a segment {segment:?} outside its directory",
                        self.name
                    )),
                }
            })
    }
}

/// Read the manifest stored in `dir`, if there is one
pub fn read_manifest(dir: &Path) -> Result<Option<Vec<FileInfo>>> {
    let path = dir.join(MANIFEST_NAME);
    if !path.is_file() {
        return Ok(None);
    }

    let file = File::open(&path)
        .into_diagnostic()
        .context(format!("opening {}", path.display()))?;

    serde_json::from_reader(BufReader::new(file))
        .into_diagnostic()
        .context(format!("parsing {}", path.display()))
        .map(Some)
}

/// Write `files` as the manifest of `dir`
pub fn write_manifest(dir: &Path, files: &[FileInfo]) -> Result<()> {
    let path = dir.join(MANIFEST_NAME);
    let file = File::create(&path)
        .into_diagnostic()
        .context(format!("creating {}", path.display()))?;

    serde_json::to_writer_pretty(BufWriter::new(file), files)
        .into_diagnostic()
        .context(format!("writing {}", path.display()))
}

/// Read an entry name list, one `/` separated path per line
pub fn read_file_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .context(format!("reading {}", path.display()))?;

    Ok(text.lines().map(|line| line.trim().to_string()).collect())
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use aot_bin::{Directory, Entry, EntryKind};
    use pretty_assertions::assert_eq;

    use super::FileInfo;

    #[test]
    fn manifest_uses_kind_names() -> miette::Result<()> {
        let mut root = Directory::new();
        root.insert("b/two.bin", Entry::new(EntryKind::Compressed, 2, vec![1]))?;
        root.insert("a/one.bin", Entry::new(EntryKind::Normal, 1, vec![2]))?;

        let files = FileInfo::collect(&root);
        assert_eq!(files[0].name, "a/one.bin");

        let json = serde_json::to_string(&files).map_err(|e| miette::miette!("{e}"))?;
        assert_eq!(
            json,
            r#"[{"name":"a/one.bin","type":"Normal","index":1},{"name":"b/two.bin","type":"Compressed","index":2}]"#
        );

        Ok(())
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result =
            serde_json::from_str::<Vec<FileInfo>>(r#"[{"name":"a","type":"Encrypted","index":1}]"#);

        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("unsupported entry kind Encrypted"));
    }

    fn info(name: &str) -> FileInfo {
        FileInfo {
            name: name.into(),
            kind: EntryKind::Normal,
            index: 1,
        }
    }

    #[test]
    fn names_map_to_paths() -> miette::Result<()> {
        assert_eq!(
            info("chr/eren.g1m").path_in(Path::new("out"))?,
            Path::new("out").join("chr").join("eren.g1m")
        );
        assert_eq!(
            info("/ui//title.g1t").path_in(Path::new("out"))?,
            Path::new("out").join("ui").join("title.g1t")
        );

        Ok(())
    }

    #[test]
    fn names_cannot_leave_the_directory() {
        for name in ["../escape.bin", "chr/../../escape.bin", "./chr/eren.g1m", "chr/.."] {
            assert!(
                info(name).path_in(Path::new("out")).is_err(),
                "{name} should be rejected"
            );
        }
    }
}
