pub mod bin;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle BIN archives
    Bin {
        #[command(subcommand)]
        command: bin::BinCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Bin { command } => command.handle(),
        }
    }
}
