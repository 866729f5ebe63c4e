// CLI subcommand dispatch.

use clap::Subcommand;

pub mod set_token;
pub mod start;
pub mod stop;

#[derive(Subcommand)]
pub enum Command {
    /// Start an auto-push session in a workspace
    Start(start::StartArgs),
    /// Stop the session running in a workspace
    Stop(stop::StopArgs),
    /// Store the GitHub personal access token
    SetToken(set_token::SetTokenArgs),
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Start(args) => start::run(args).await,
        Command::Stop(args) => stop::run(args).await,
        Command::SetToken(args) => set_token::run(args),
    }
}
