use clap::Args;
use itertools::Itertools;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use aot_bin::{BinArchive, Endian};

use super::manifest::{read_file_list, FileInfo};

#[derive(Args)]
pub struct InfoArgs {
    /// An input BIN file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// A text file naming the archive entries, one path per line
    #[arg(long, value_name = "FILE")]
    file_list: Option<PathBuf>,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let names = match &self.file_list {
            Some(path) => read_file_list(path)?,
            None => Vec::new(),
        };

        let data = std::fs::read(&self.input)
            .into_diagnostic()
            .context(format!("path: {}", self.input.display()))?;
        let bin = BinArchive::with_names(&data, &names)?;

        let endian = match bin.endian() {
            Endian::Big => "big endian",
            Endian::Little => "little endian",
        };
        println!(
            "{} {} archive, {}, block size {:#x}",
            bin.variant().bold(),
            endian,
            format!("{} entries", bin.len()).blue(),
            bin.block_size()
        );

        let rows = FileInfo::collect(bin.root())
            .into_iter()
            .map(|info| {
                let stored = bin
                    .root()
                    .get(&info.name)
                    .map(|entry| entry.data().len())
                    .unwrap_or_default();
                format!(
                    "{:>5}  {:<26} {:>10}  {}",
                    info.index,
                    info.kind.as_str(),
                    stored,
                    info.name
                )
            })
            .join("\n");
        println!("{rows}");

        Ok(())
    }
}
