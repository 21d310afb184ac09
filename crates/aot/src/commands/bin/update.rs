use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::{fs::File, io::BufWriter, path::PathBuf};
use aot_bin::{BinArchive, BinWriter};
use tracing::info;
use walkdir::WalkDir;

use super::build::relative_name;
use super::manifest::{read_file_list, MANIFEST_NAME};

#[derive(Args)]
pub struct UpdateArgs {
    /// The BIN file to update
    #[arg(long, value_name = "FILE")]
    input_bin: PathBuf,

    /// A directory holding the replacement files at their archive paths
    #[arg(long, value_name = "DIR")]
    input_dir: PathBuf,

    /// A target BIN file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// A text file naming the archive entries, one path per line
    #[arg(long, value_name = "FILE")]
    file_list: Option<PathBuf>,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    force: bool,
}

impl UpdateArgs {
    pub fn handle(&self) -> Result<()> {
        let names = match &self.file_list {
            Some(path) => read_file_list(path)?,
            None => Vec::new(),
        };

        info!("reading {}", self.input_bin.display());
        let data = std::fs::read(&self.input_bin)
            .into_diagnostic()
            .context(format!("path: {}", self.input_bin.display()))?;

        let mut bin = BinArchive::with_names(&data, &names)?;
        bin.decompress()?;
        let options = bin.writer_options();

        let mut changes = Vec::new();
        for file in WalkDir::new(&self.input_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
        {
            let name = relative_name(&self.input_dir, file.path())?;
            if name == MANIFEST_NAME {
                continue;
            }

            let content = std::fs::read(file.path())
                .into_diagnostic()
                .context(format!("reading {}", file.path().display()))?;
            changes.push((name, content));
        }

        let report = aot_bin::update(bin.root_mut(), changes);
        for name in &report.updated {
            println!("{} {}", "updated".green(), name);
        }
        for missing in &report.missing {
            println!("{} {}", "not found".yellow(), missing);
        }

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
            .write(bin.root())
            .context(format!("writing {}", self.output.display()))?;

        info!(
            "updated {} of {} entries",
            report.updated.len(),
            bin.len()
        );

        Ok(())
    }
}
