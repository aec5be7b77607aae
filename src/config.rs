use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gmail search syntax selecting messages still to be downloaded.
    pub query: String,
    /// Label that processed messages are moved to.
    pub folder: String,
    pub poll_interval_secs: u64,
    pub output_dir: PathBuf,
    pub save_attachments: bool,
    pub save_body: bool,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub scope: String,
    pub client_secret_path: PathBuf,
    /// Where the file token store keeps its tokens.
    pub credential_path: PathBuf,
    /// Used as the keyring service name.
    pub app_name: String,
    pub token_storage: TokenStorageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorageKind {
    File,
    Keyring,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query: r#"subject:(Message "from RockBLOCK") is:unread has:attachment"#.to_string(),
            folder: "SBD".to_string(),
            poll_interval_secs: 15,
            output_dir: PathBuf::from("."),
            save_attachments: true,
            save_body: false,
            auth: AuthConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Everything except delete
            scope: "https://www.googleapis.com/auth/gmail.modify".to_string(),
            client_secret_path: PathBuf::from("client_secret.json"),
            credential_path: PathBuf::from(".credentials/sbd-downloader.json"),
            app_name: "sbd-downloader".to_string(),
            token_storage: TokenStorageKind::File,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        if config.folder.is_empty() {
            anyhow::bail!("folder must not be empty");
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
