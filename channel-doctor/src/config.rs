//! Command-line arguments and the optional TOML config file.

use clap::Parser;
use eyre::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "channel-doctor")]
#[command(about = "YouTube channel health report: views, views per hour, and underperforming videos")]
#[command(version)]
pub struct Cli {
    /// Channel ID (UC...), handle (@name), or channel URL
    pub channel: String,

    /// YouTube Data API v3 key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// How many of the most recent uploads to analyze
    #[arg(short = 'n', long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(1..=200))]
    pub max_videos: u16,

    /// Rows shown in each ranking table
    #[arg(long, default_value_t = 10)]
    pub top: usize,

    /// Write the per-video table as CSV (`--csv` alone writes channel_analysis.csv; name a file
    /// with `--csv=PATH`)
    #[arg(
        long,
        value_name = "PATH",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = crate::export::DEFAULT_CSV_NAME
    )]
    pub csv: Option<PathBuf>,

    /// Write the whole report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Also fetch the audience-geography report (requires OAuth authorization)
    #[arg(long)]
    pub geography: bool,

    /// Length of the geography report window, ending yesterday
    #[arg(long, default_value_t = 28, value_parser = clap::value_parser!(u16).range(1..=3650))]
    pub days: u16,

    /// OAuth client ID for the geography report
    #[arg(long, env = "YOUTUBE_OAUTH_CLIENT_ID")]
    pub oauth_client_id: Option<String>,

    /// OAuth client secret for the geography report
    #[arg(long, env = "YOUTUBE_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub oauth_client_secret: Option<String>,

    /// Where the OAuth token is kept between runs
    #[arg(long, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// TOML file providing defaults for the credentials above
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Contents of the `--config` file. Every key is optional.
///
/// ```toml
/// api_key = "AIza..."
/// token_file = "/home/me/.config/channel-doctor/tokens.json"
///
/// [oauth]
/// client_id = "1234.apps.googleusercontent.com"
/// client_secret = "GOCSPX-..."
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub token_file: Option<PathBuf>,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }
}

/// OAuth client credentials for the installed-app flow.
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub channel: String,
    pub api_key: String,
    pub max_videos: usize,
    pub top: usize,
    pub csv: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// Present only when the geography report was requested.
    pub geography: Option<GeographySettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeographySettings {
    pub days: u16,
    pub oauth: OAuthClientConfig,
    pub token_file: PathBuf,
}

impl Settings {
    /// Merges CLI arguments (which include environment variables) over the config file.
    ///
    /// Fails before any network traffic if a required credential is missing.
    pub fn resolve(cli: Cli, file: FileConfig) -> eyre::Result<Self> {
        let channel = cli.channel.trim().to_string();
        if channel.is_empty() {
            eyre::bail!("no channel given; pass a channel ID, @handle or channel URL");
        }

        let Some(api_key) = cli.api_key.or(file.api_key).filter(|k| !k.trim().is_empty()) else {
            eyre::bail!(
                "no YouTube Data API key; pass --api-key, set YOUTUBE_API_KEY, or add api_key to the config file"
            );
        };

        let geography = if cli.geography {
            let client_id = cli.oauth_client_id.or(file.oauth.client_id);
            let client_secret = cli.oauth_client_secret.or(file.oauth.client_secret);
            let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
                eyre::bail!(
                    "--geography needs OAuth client credentials; pass --oauth-client-id and --oauth-client-secret or add an [oauth] section to the config file"
                );
            };
            Some(GeographySettings {
                days: cli.days,
                oauth: OAuthClientConfig {
                    client_id,
                    client_secret,
                },
                token_file: cli
                    .token_file
                    .or(file.token_file)
                    .unwrap_or_else(|| PathBuf::from("tokens.json")),
            })
        } else {
            None
        };

        Ok(Self {
            channel,
            api_key: api_key.trim().to_string(),
            max_videos: usize::from(cli.max_videos),
            top: cli.top,
            csv: cli.csv,
            json: cli.json,
            geography,
        })
    }
}
