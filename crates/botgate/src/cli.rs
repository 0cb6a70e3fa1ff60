//! Command-line arguments and environment fallbacks.

use std::path::PathBuf;

use clap::Parser;

use crate::Result;
use crate::config::ServerConfig;

/// Botgate - authenticated webhook for bot messages
#[derive(Parser, Debug, Default)]
#[command(name = "botgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "BOTGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen address
    #[arg(long, env = "BOTGATE_BIND")]
    pub bind: Option<String>,

    /// Bot app id
    #[arg(long, env = "MICROSOFT_APP_ID")]
    pub app_id: Option<String>,

    /// Bot app password
    #[arg(long, env = "MICROSOFT_APP_PASSWORD", hide_env_values = true)]
    pub app_password: Option<String>,

    /// OpenID metadata URL for channel signing keys
    #[arg(long, env = "BOTGATE_OPENID_METADATA_URL")]
    pub openid_metadata_url: Option<String>,

    /// Reject tokens issued by the local emulator
    #[arg(long, env = "BOTGATE_DISABLE_EMULATOR_TOKENS")]
    pub disable_emulator_tokens: bool,

    /// Keep the raw bearer token on the authenticated principal
    #[arg(long, env = "BOTGATE_SAVE_TOKEN")]
    pub save_token: bool,

    /// Let every request through (local development only)
    #[arg(long, env = "BOTGATE_DISABLE_AUTHENTICATION")]
    pub disable_authentication: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the final configuration: file first, then flags and
    /// environment on top. Flags only ever switch booleans on.
    pub fn into_config(self) -> Result<ServerConfig> {
        let mut config = ServerConfig::load(self.config.as_deref())?;

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(app_id) = self.app_id {
            config.auth.app_id = Some(app_id);
        }
        if let Some(app_password) = self.app_password {
            config.auth.app_password = Some(app_password);
        }
        if let Some(url) = self.openid_metadata_url {
            config.auth.openid_metadata_url = url;
        }
        config.auth.disable_emulator_tokens |= self.disable_emulator_tokens;
        config.auth.save_token |= self.save_token;
        config.auth.disable_authentication |= self.disable_authentication;

        config.validate()?;
        Ok(config)
    }
}
