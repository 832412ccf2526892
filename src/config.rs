use std::env;

/// Permission scope requested for Drive access.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_MAX_WIDTH: u32 = 1024;
const DEFAULT_WEBP_QUALITY: f32 = 80.0;

/// Transcoding settings for ingested images.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageConfig {
    /// Maximum bounding width in pixels. Smaller images are never upscaled.
    pub max_width: u32,
    /// WebP encoder quality, 0-100.
    pub quality: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_WEBP_QUALITY,
        }
    }
}

impl ImageConfig {
    /// Read `MAX_IMAGE_WIDTH` and `WEBP_QUALITY` from the environment,
    /// falling back to the defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        ImageConfig {
            max_width: env_parsed("MAX_IMAGE_WIDTH", DEFAULT_MAX_WIDTH),
            quality: env_parsed("WEBP_QUALITY", DEFAULT_WEBP_QUALITY),
        }
    }
}

/// OAuth client settings and the optional default upload folder.
#[derive(Debug, Clone, Default)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Folder used for uploads when the caller does not name one.
    pub default_folder_id: Option<String>,
    pub scopes: Vec<String>,
}

impl DriveConfig {
    pub fn from_env() -> Self {
        DriveConfig {
            client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            redirect_uri: env::var("GOOGLE_REDIRECT_URI").unwrap_or_default(),
            default_folder_id: env::var("GOOGLE_DRIVE_FOLDER_ID").ok().filter(|v| !v.is_empty()),
            scopes: vec![DRIVE_SCOPE.to_string()],
        }
    }

    /// Whether OAuth credentials were provided at all.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
