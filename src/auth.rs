use crate::config::{AuthConfig, TokenStorageKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_gmail1::oauth2;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tracing::{info, warn};
use yup_oauth2::authenticator_delegate::{DefaultInstalledFlowDelegate, InstalledFlowDelegate};
use yup_oauth2::storage::{TokenInfo, TokenStorage};
use yup_oauth2::{
    ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
    read_application_secret,
};

pub type GmailAuthenticator =
    oauth2::authenticator::Authenticator<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

const TOKEN_KEY: &str = "gmail_token";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TokenData {
    tokens: Vec<TokenInfo>,
}

/// Keeps the OAuth token in the OS keyring under the configured app name.
pub struct RingStorage {
    service: String,
}

impl RingStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_KEY).map_err(|e| anyhow::anyhow!("Keyring error: {}", e))
    }

    async fn get_all(&self) -> Result<TokenData> {
        match self.entry()?.get_password() {
            Ok(serialized) => {
                serde_json::from_str(&serialized).context("Failed to deserialize tokens")
            }
            Err(keyring::Error::NoEntry) => Ok(TokenData::default()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }

    pub async fn clear_token(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Keyring error: {}", e)),
        }
    }
}

#[async_trait]
impl TokenStorage for RingStorage {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> Result<()> {
        let data = TokenData {
            tokens: vec![token],
        };
        let serialized = serde_json::to_string(&data).context("Failed to serialize tokens")?;

        self.entry()?
            .set_password(&serialized)
            .map_err(|e| anyhow::anyhow!("Keyring error: {}", e))?;

        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.get_all()
            .await
            .ok()
            .and_then(|data| data.tokens.into_iter().next())
    }
}

/// Logs the consent URL and tries to open it in a browser.
pub struct BrowserDelegate;

impl InstalledFlowDelegate for BrowserDelegate {
    fn present_user_url<'a>(
        &'a self,
        url: &'a str,
        need_code: bool,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            if need_code {
                return DefaultInstalledFlowDelegate
                    .present_user_url(url, need_code)
                    .await;
            }
            info!("Authorize this application by visiting: {}", url);
            if let Err(e) = open::that(url) {
                warn!(error = %e, "Could not open a browser; open the URL above manually");
            }
            Ok(String::new())
        })
    }
}

pub struct Authenticator;

impl Authenticator {
    pub async fn load_secret<P: AsRef<Path>>(path: P) -> Result<ApplicationSecret> {
        read_application_secret(path)
            .await
            .context("Failed to read application secret")
    }

    pub async fn authenticate(
        secret: ApplicationSecret,
        config: &AuthConfig,
    ) -> Result<GmailAuthenticator> {
        let builder =
            InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
                .flow_delegate(Box::new(BrowserDelegate));

        let builder = match config.token_storage {
            TokenStorageKind::File => {
                if let Some(dir) = config.credential_path.parent() {
                    if !dir.as_os_str().is_empty() {
                        std::fs::create_dir_all(dir).with_context(|| {
                            format!("Failed to create credential directory {}", dir.display())
                        })?;
                    }
                }
                builder.persist_tokens_to_disk(&config.credential_path)
            }
            TokenStorageKind::Keyring => {
                builder.with_storage(Box::new(RingStorage::new(&config.app_name)))
            }
        };

        let auth = builder
            .build()
            .await
            .context("Failed to build authenticator")?;

        Ok(auth)
    }

    /// Forgets any stored token so the next start runs the consent flow again.
    pub async fn reset_token(config: &AuthConfig) -> Result<()> {
        match config.token_storage {
            TokenStorageKind::File => match tokio::fs::remove_file(&config.credential_path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e).with_context(|| {
                    format!("Failed to remove {}", config.credential_path.display())
                }),
            },
            TokenStorageKind::Keyring => RingStorage::new(&config.app_name).clear_token().await,
        }
    }
}
