//! Botgate server
//!
//! Standalone webhook server for receiving authenticated bot activities.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use botgate::Cli;
use botgate_auth_openid::OpenIdTokenVerifier;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    botgate::logging::init(cli.verbose);

    let config = cli.into_config()?;
    tracing::debug!("Resolved configuration: {config:?}");

    let verifier = Arc::new(OpenIdTokenVerifier::new()?);
    botgate::serve(config, verifier).await?;
    Ok(())
}
