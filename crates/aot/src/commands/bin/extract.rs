use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{fs::File, io::Write, path::PathBuf};
use aot_bin::BinArchive;
use tracing::info;

use super::manifest::{read_file_list, write_manifest, FileInfo};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input BIN file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// A text file naming the archive entries, one path per line
    #[arg(long, value_name = "FILE")]
    file_list: Option<PathBuf>,

    /// Replace the target directory if it already exists
    #[arg(long, default_value_t = false)]
    force: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        if self.output.exists() {
            if !self.force {
                return Err(miette!(
                    "{} already exists, use --force to replace it",
                    self.output.display()
                ));
            }

            info!("removing {}", self.output.display());
            std::fs::remove_dir_all(&self.output)
                .into_diagnostic()
                .context(format!("removing {}", self.output.display()))?;
        }

        let names = match &self.file_list {
            Some(path) => {
                info!("using {} as file list", path.display());
                read_file_list(path)?
            }
            None => Vec::new(),
        };

        info!("reading {}", self.input.display());
        let data = std::fs::read(&self.input)
            .into_diagnostic()
            .context(format!("path: {}", self.input.display()))?;

        let mut bin = BinArchive::with_names(&data, &names)?;
        bin.decompress()?;

        let files = FileInfo::collect(bin.root());
        for info in &files {
            let p = info.path_in(&self.output)?;
            info!("writing {}", p.display());

            let entry = bin
                .root()
                .get(&info.name)
                .ok_or(miette!("entry {} vanished from the tree", info.name))?;

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .into_diagnostic()
                    .context(format!("creating {}", parent.display()))?;
            }

            File::create_new(&p)
                .into_diagnostic()
                .context(format!("creating {}", p.display()))?
                .write_all(entry.data())
                .into_diagnostic()
                .context(format!("writing {}", p.display()))?;
        }

        std::fs::create_dir_all(&self.output).into_diagnostic()?;
        write_manifest(&self.output, &files)?;

        info!("extracted {} entries", files.len());

        Ok(())
    }
}
