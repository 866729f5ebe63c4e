// `autopush set-token`: store the GitHub personal access token.
//
// The token goes straight into the OS keychain; it is never written to
// disk or to the log output.

use anyhow::{Context, Result};
use clap::Args;

use autopush_core::secrets::CredentialStore;

use crate::prompt;

#[derive(Args)]
pub struct SetTokenArgs {}

pub fn run(_args: SetTokenArgs) -> Result<()> {
    let Some(token) = prompt::read_line("GitHub personal access token: ")? else {
        // Cancelled: keep whatever was stored before.
        return Ok(());
    };

    CredentialStore::new()
        .set(&token)
        .context("failed to store the token in the OS keychain")?;
    println!("Token saved.");
    Ok(())
}
