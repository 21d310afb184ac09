use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use aot_bin::{
    types::DEFAULT_BLOCK_SIZE, ArchiveVariant, BinWriter, BinWriterOptions, Directory, Endian,
    Entry, EntryKind,
};
use tracing::{info, warn};
use walkdir::WalkDir;

use super::manifest::{read_manifest, FileInfo, MANIFEST_NAME};

#[derive(Args)]
pub struct BuildArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    /// A target BIN file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Write a big endian archive (PS3)
    #[arg(long, default_value_t = false)]
    big_endian: bool,

    /// Write a DLC archive
    #[arg(long, default_value_t = false)]
    dlc: bool,

    /// Alignment of entry data, decimal or 0x prefixed hexadecimal
    #[arg(long, value_name = "N", value_parser = parse_block_size, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: i32,

    /// Compress files that are not listed in a manifest
    #[arg(long, default_value_t = false)]
    compress: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn parse_block_size(value: &str) -> std::result::Result<i32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i32::from_str_radix(hex, 16),
        None => value.parse(),
    };

    match parsed {
        Ok(size) if size > 0 => Ok(size),
        Ok(size) => Err(format!("block size must be positive, got {size}")),
        Err(e) => Err(e.to_string()),
    }
}

impl BuildArgs {
    pub fn handle(&self) -> Result<()> {
        let root = match read_manifest(&self.input)? {
            Some(files) => {
                info!("building from {}", MANIFEST_NAME);
                self.tree_from_manifest(&files)?
            }
            None => {
                warn!("no {} found, adding every file in {}", MANIFEST_NAME, self.input.display());
                self.tree_from_directory()?
            }
        };

        let options = BinWriterOptions::builder()
            .variant(if self.dlc {
                ArchiveVariant::Dlc
            } else {
                ArchiveVariant::Standard
            })
            .endian(if self.big_endian {
                Endian::Big
            } else {
                Endian::Little
            })
            .block_size(self.block_size)
            .build();

        info!("creating {}", self.output.display());
        let out = if !self.force {
            File::create_new(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", self.output.display()))?
        } else {
            File::create(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", self.output.display()))?
        };

        BinWriter::new(BufWriter::new(out), options)
            .write(&root)
            .context(format!("writing {}", self.output.display()))?;

        info!("wrote {} entries", root.len());

        Ok(())
    }

    fn tree_from_manifest(&self, files: &[FileInfo]) -> Result<Directory> {
        let mut root = Directory::new();
        for info in files {
            let data = match info.kind {
                EntryKind::Empty | EntryKind::Dummy => Vec::new(),
                _ => {
                    let p = info.path_in(&self.input)?;
                    info!("adding {}", p.display());
                    std::fs::read(&p)
                        .into_diagnostic()
                        .context(format!("reading {}", p.display()))?
                }
            };

            root.insert(&info.name, Entry::new(info.kind, info.index, data))
                .context(format!("adding {}", info.name))?;
        }

        Ok(root)
    }

    fn tree_from_directory(&self) -> Result<Directory> {
        let kind = if self.compress {
            EntryKind::Compressed
        } else {
            EntryKind::Normal
        };

        let files = WalkDir::new(&self.input)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .collect::<Vec<_>>();

        if files.is_empty() {
            return Err(miette!("directory is empty"));
        }

        let mut root = Directory::new();
        for (i, file) in files.iter().enumerate() {
            let name = relative_name(&self.input, file.path())?;
            info!("adding {}", name);

            let data = std::fs::read(file.path())
                .into_diagnostic()
                .context(format!("reading {}", file.path().display()))?;

            root.insert(&name, Entry::new(kind, i as u32 + 1, data))
                .context(format!("adding {}", name))?;
        }

        Ok(root)
    }
}

/// The `/` separated path of `path` below `base`
pub(super) fn relative_name(base: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(base).into_diagnostic()?;

    let segments = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or(miette!("unable to convert {} to a string", relative.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(segments.join("/"))
}
