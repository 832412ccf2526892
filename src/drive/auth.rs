use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use url::Url;

use crate::config::DriveConfig;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Token material persisted by an external OAuth flow. This crate only loads
/// what that flow saved; acquiring and refreshing tokens happens elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Saved-token storage under the platform config directory.
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new() -> Result<Self, String> {
        let path = dirs::config_dir()
            .ok_or("Could not determine config directory")?
            .join("picdrop")
            .join("token.json");
        Ok(TokenStore { path })
    }

    /// Store backed by an explicit file, for tests and custom deployments.
    pub fn at(path: PathBuf) -> Self {
        TokenStore { path }
    }

    /// Load the saved token. A missing or unreadable file is treated as "not
    /// connected" rather than an error.
    pub fn load(&self) -> Option<SavedToken> {
        let json = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&json) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Ignoring unparsable token file {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub fn save(&self, token: &SavedToken) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create token directory: {}", e))?;
        }
        let json = serde_json::to_string(token)
            .map_err(|e| format!("Failed to serialize token: {}", e))?;
        fs::write(&self.path, json).map_err(|e| format!("Failed to write token file: {}", e))
    }

    pub fn clear(&self) -> Result<(), String> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Failed to remove token file: {}", e)),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.load().is_some()
    }
}

/// Build the consent URL a user visits to connect their account.
pub fn auth_url(config: &DriveConfig) -> Result<String, String> {
    if !config.is_configured() {
        return Err("Google OAuth credentials are not configured".to_string());
    }

    let mut url =
        Url::parse(AUTH_ENDPOINT).map_err(|e| format!("Invalid auth endpoint: {}", e))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DRIVE_SCOPE;
    use tempfile::tempdir;

    fn config() -> DriveConfig {
        DriveConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/auth/callback".to_string(),
            default_folder_id: None,
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    #[test]
    fn token_round_trip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = TokenStore::at(dir.path().join("token.json"));

        assert!(!store.is_authenticated());
        assert!(store.load().is_none());

        store
            .save(&SavedToken {
                access_token: "ya29.abc".to_string(),
                refresh_token: Some("1//refresh".to_string()),
                expires_at: None,
            })
            .expect("save should succeed");

        assert!(store.is_authenticated());
        let token = store.load().expect("token should load");
        assert_eq!(token.access_token, "ya29.abc");

        store.clear().expect("clear should succeed");
        assert!(!store.is_authenticated());
        // Clearing twice is fine.
        store.clear().expect("second clear should succeed");
    }

    #[test]
    fn unparsable_token_file_reads_as_disconnected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").expect("write should succeed");

        let store = TokenStore::at(path);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn auth_url_carries_client_and_scope() {
        let url = auth_url(&config()).expect("auth url should build");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn auth_url_requires_credentials() {
        assert!(auth_url(&DriveConfig::default()).is_err());
    }
}
