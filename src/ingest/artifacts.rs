use base64::Engine as _;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::transcode::WEBP_MIME;

/// A transcoded image spooled to local storage, addressed by its derived
/// filename.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Bytes,
    pub path: PathBuf,
}

impl Artifact {
    /// Render the artifact as a `data:` URL, the form UI consumers can use
    /// directly without touching the filesystem.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            WEBP_MIME,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Content-addressed spool for transcoded artifacts. Filenames are derived
/// from content hashes, so a name collision means identical bytes and the
/// existing file is reused.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Spool under the platform cache directory.
    pub fn new() -> Result<Self, String> {
        let dir = dirs::cache_dir()
            .ok_or("Could not determine cache directory")?
            .join("picdrop")
            .join("artifacts");
        Self::at(dir)
    }

    /// Spool under an explicit directory, for tests and custom deployments.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, String> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create artifact directory: {}", e))?;
        Ok(ArtifactStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<Artifact, String> {
        let path = self.dir.join(filename);

        if fs::try_exists(&path)
            .await
            .map_err(|e| format!("Failed to check artifact file: {}", e))?
        {
            log::debug!("Artifact {} already spooled, reusing", filename);
        } else {
            fs::write(&path, bytes)
                .await
                .map_err(|e| format!("Failed to write artifact file: {}", e))?;
        }

        Ok(Artifact {
            filename: filename.to_string(),
            bytes: Bytes::copy_from_slice(bytes),
            path,
        })
    }
}
