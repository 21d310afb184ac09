pub mod build;
pub mod extract;
pub mod info;
pub mod manifest;
pub mod update;

#[derive(clap::Subcommand)]
pub enum BinCommands {
    /// Extract a BIN archive into a directory
    Extract(extract::ExtractArgs),
    /// Build a BIN archive from a directory
    Build(build::BuildArgs),
    /// Replace files inside an existing BIN archive
    Update(update::UpdateArgs),
    /// List the contents of a BIN archive
    Info(info::InfoArgs),
}

impl BinCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            BinCommands::Extract(extract) => extract.handle(),
            BinCommands::Build(build) => build.handle(),
            BinCommands::Update(update) => update.handle(),
            BinCommands::Info(info) => info.handle(),
        }
    }
}
