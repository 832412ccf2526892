use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;

pub mod artifacts;
pub mod ledger;
pub mod transcode;

pub use artifacts::{Artifact, ArtifactStore};
pub use ledger::{CompletionPayload, UploadRecord, UploadResultLedger, UploadStatus};
pub use transcode::{TranscodedImage, WEBP_MIME};

use crate::config::ImageConfig;
use crate::drive::{DriveApi, DriveUpload};

/// Hex length the content hash is truncated to for derived filenames.
const FINGERPRINT_LEN: usize = 16;

/// SHA-256 of the raw bytes, truncated. Bit-identical inputs always map to
/// the same fingerprint.
pub fn content_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..FINGERPRINT_LEN].to_string()
}

/// Canonical content-addressed filename for an ingested image.
pub fn derived_filename(bytes: &[u8]) -> String {
    format!("{}.webp", content_fingerprint(bytes))
}

/// Accept files by name: anything whose guessed mime type is an image.
pub fn is_image_file(name: &str) -> bool {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false)
}

/// A file handed to the pipeline by drop/paste glue.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub bytes: Bytes,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        IncomingFile {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Outcome of one file's ingestion. `drive` is present only when the
/// best-effort remote upload went through.
#[derive(Debug, Clone)]
pub struct IngestedImage {
    pub filename: String,
    pub optimized_size: u64,
    pub artifact: Artifact,
    pub drive: Option<DriveUpload>,
}

/// Totals for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub success_count: usize,
}

/// Hashes an incoming image, transcodes it, spools the result locally and
/// attempts a best-effort Drive upload. Remote failure never blocks local
/// delivery; transcode failure fails the file.
pub struct IngestionPipeline {
    drive: Arc<dyn DriveApi>,
    config: ImageConfig,
    artifacts: ArtifactStore,
}

impl IngestionPipeline {
    pub fn new(drive: Arc<dyn DriveApi>, config: ImageConfig, artifacts: ArtifactStore) -> Self {
        IngestionPipeline {
            drive,
            config,
            artifacts,
        }
    }

    /// Run the full per-file pipeline. Errors out only when transcoding or
    /// local spooling fails; the remote leg degrades to `drive: None`.
    pub async fn process_file(
        &self,
        bytes: &[u8],
        target_folder: Option<&str>,
    ) -> Result<IngestedImage, String> {
        let filename = derived_filename(bytes);

        let transcoded = transcode::transcode(bytes, &self.config)?;
        let artifact = self.artifacts.store(&filename, &transcoded.bytes).await?;
        let drive = self.try_upload(&artifact, target_folder).await;

        Ok(IngestedImage {
            filename,
            optimized_size: artifact.bytes.len() as u64,
            artifact,
            drive,
        })
    }

    async fn try_upload(
        &self,
        artifact: &Artifact,
        target_folder: Option<&str>,
    ) -> Option<DriveUpload> {
        if !self.drive.is_authenticated() {
            log::info!(
                "Skipping Drive upload for {}: not connected",
                artifact.filename
            );
            return None;
        }

        match self
            .drive
            .upload_bytes(
                artifact.bytes.clone(),
                &artifact.filename,
                WEBP_MIME,
                target_folder,
            )
            .await
        {
            Ok(upload) => Some(upload),
            Err(e) => {
                log::warn!(
                    "Drive upload failed for {} (local copy unaffected): {}",
                    artifact.filename,
                    e
                );
                None
            }
        }
    }

    /// Ingest a batch sequentially in submission order, recording each
    /// file's lifecycle in `ledger`. Non-image files are skipped; a file
    /// that fails to transcode is marked failed and the batch continues.
    pub async fn ingest_batch(
        &self,
        files: Vec<IncomingFile>,
        target_folder: Option<&str>,
        ledger: &UploadResultLedger,
    ) -> BatchSummary {
        let mut success_count = 0;

        for file in files {
            if !is_image_file(&file.name) {
                log::debug!("Skipping non-image file {}", file.name);
                continue;
            }

            let id = ledger.add_pending(&file.name, file.bytes.len() as u64);

            match self.process_file(&file.bytes, target_folder).await {
                Ok(result) => {
                    ledger.mark_done(
                        id,
                        CompletionPayload {
                            optimized_size: Some(result.optimized_size),
                            artifact_path: Some(result.artifact.path.clone()),
                            filename: Some(result.filename.clone()),
                            drive_link: result.drive.as_ref().and_then(|d| d.web_view_link.clone()),
                        },
                    );
                    success_count += 1;
                }
                Err(e) => {
                    log::error!("Failed to ingest {}: {}", file.name, e);
                    ledger.mark_failed(id);
                }
            }
        }

        BatchSummary { success_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tempfile::tempdir;

    use crate::drive::{DriveFolder, DriveItem};

    fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8 ^ seed, (y % 256) as u8, seed])
        });
        let mut buffer = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .expect("Failed to encode test PNG");
        buffer
    }

    /// Drive stub recording upload calls, optionally failing them.
    struct RecordingDrive {
        authenticated: bool,
        fail_uploads: bool,
        uploads: Mutex<Vec<(String, Option<String>)>>,
    }

    impl RecordingDrive {
        fn new(authenticated: bool, fail_uploads: bool) -> Self {
            RecordingDrive {
                authenticated,
                fail_uploads,
                uploads: Mutex::new(Vec::new()),
            }
        }

        fn upload_count(&self) -> usize {
            self.uploads.lock().expect("Failed to lock uploads").len()
        }
    }

    #[async_trait]
    impl DriveApi for RecordingDrive {
        async fn list_folders(&self) -> Result<Vec<DriveFolder>, String> {
            Err("unused".to_string())
        }

        async fn list_items(&self, _parent_id: &str) -> Result<Vec<DriveItem>, String> {
            Err("unused".to_string())
        }

        async fn create_folder(
            &self,
            _name: &str,
            _parent_id: Option<&str>,
        ) -> Result<DriveFolder, String> {
            Err("unused".to_string())
        }

        async fn upload_bytes(
            &self,
            _bytes: Bytes,
            filename: &str,
            _mime_type: &str,
            folder_id: Option<&str>,
        ) -> Result<DriveUpload, String> {
            self.uploads
                .lock()
                .expect("Failed to lock uploads")
                .push((filename.to_string(), folder_id.map(str::to_string)));

            if self.fail_uploads {
                return Err("remote said no".to_string());
            }
            Ok(DriveUpload {
                id: format!("remote-{}", filename),
                name: filename.to_string(),
                web_view_link: Some(format!("https://drive.google.com/file/d/{}/view", filename)),
            })
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated
        }
    }

    fn pipeline(drive: Arc<RecordingDrive>, dir: &std::path::Path) -> IngestionPipeline {
        IngestionPipeline::new(
            drive,
            ImageConfig::default(),
            ArtifactStore::at(dir).expect("artifact store should init"),
        )
    }

    #[test]
    fn identical_bytes_share_a_filename() {
        let bytes = png_bytes(64, 64, 1);
        assert_eq!(derived_filename(&bytes), derived_filename(&bytes));
        assert_ne!(
            derived_filename(&bytes),
            derived_filename(&png_bytes(64, 64, 2))
        );

        let name = derived_filename(&bytes);
        assert_eq!(name.len(), FINGERPRINT_LEN + ".webp".len());
        assert!(name.ends_with(".webp"));
    }

    #[test]
    fn image_acceptance_goes_by_name() {
        assert!(is_image_file("photo.png"));
        assert!(is_image_file("photo.JPG"));
        assert!(is_image_file("photo.webp"));
        assert!(!is_image_file("notes.txt"));
        assert!(!is_image_file("archive"));
    }

    #[tokio::test]
    async fn successful_ingest_uploads_and_records_done() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(true, false));
        let pipeline = pipeline(drive.clone(), dir.path());
        let ledger = UploadResultLedger::new();

        let bytes = png_bytes(64, 64, 3);
        let summary = pipeline
            .ingest_batch(
                vec![IncomingFile::new("shot.png", bytes.clone())],
                Some("folder-1"),
                &ledger,
            )
            .await;

        assert_eq!(summary.success_count, 1);
        assert_eq!(drive.upload_count(), 1);

        let record = &ledger.records()[0];
        assert_eq!(record.status, UploadStatus::Done);
        assert_eq!(record.original_size, bytes.len() as u64);
        assert_eq!(record.filename.as_deref(), Some(derived_filename(&bytes).as_str()));
        assert!(record.drive_link.is_some());
        assert!(record.artifact_path.as_ref().expect("artifact path").exists());

        let uploads = drive.uploads.lock().expect("Failed to lock uploads");
        assert_eq!(uploads[0].1.as_deref(), Some("folder-1"));
    }

    #[tokio::test]
    async fn upload_failure_degrades_to_local_only() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(true, true));
        let pipeline = pipeline(drive.clone(), dir.path());
        let ledger = UploadResultLedger::new();

        let summary = pipeline
            .ingest_batch(
                vec![IncomingFile::new("shot.png", png_bytes(64, 64, 4))],
                None,
                &ledger,
            )
            .await;

        // The file still succeeds; only the remote leg is missing.
        assert_eq!(summary.success_count, 1);
        let record = &ledger.records()[0];
        assert_eq!(record.status, UploadStatus::Done);
        assert!(record.drive_link.is_none());
        assert!(record.artifact_path.as_ref().expect("artifact path").exists());
    }

    #[tokio::test]
    async fn unauthenticated_sessions_skip_the_upload_entirely() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(false, false));
        let pipeline = pipeline(drive.clone(), dir.path());
        let ledger = UploadResultLedger::new();

        pipeline
            .ingest_batch(
                vec![IncomingFile::new("shot.png", png_bytes(64, 64, 5))],
                None,
                &ledger,
            )
            .await;

        assert_eq!(drive.upload_count(), 0);
        assert_eq!(ledger.records()[0].status, UploadStatus::Done);
    }

    #[tokio::test]
    async fn transcode_failure_marks_the_file_failed_and_continues() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(true, false));
        let pipeline = pipeline(drive.clone(), dir.path());
        let ledger = UploadResultLedger::new();

        let summary = pipeline
            .ingest_batch(
                vec![
                    IncomingFile::new("broken.png", &b"not an image"[..]),
                    IncomingFile::new("fine.png", png_bytes(32, 32, 6)),
                ],
                None,
                &ledger,
            )
            .await;

        assert_eq!(summary.success_count, 1);
        let records = ledger.records();
        assert_eq!(records[0].status, UploadStatus::Failed);
        assert!(records[0].artifact_path.is_none());
        assert_eq!(records[1].status, UploadStatus::Done);
    }

    #[tokio::test]
    async fn non_image_files_never_enter_the_ledger() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(true, false));
        let pipeline = pipeline(drive.clone(), dir.path());
        let ledger = UploadResultLedger::new();

        let summary = pipeline
            .ingest_batch(
                vec![IncomingFile::new("notes.txt", &b"plain text"[..])],
                None,
                &ledger,
            )
            .await;

        assert_eq!(summary.success_count, 0);
        assert!(ledger.records().is_empty());
    }

    #[tokio::test]
    async fn duplicate_inputs_collapse_onto_one_artifact() {
        let dir = tempdir().expect("Failed to create temp dir");
        let drive = Arc::new(RecordingDrive::new(false, false));
        let pipeline = pipeline(drive.clone(), dir.path());

        let bytes = png_bytes(48, 48, 7);
        let first = pipeline
            .process_file(&bytes, None)
            .await
            .expect("ingest should succeed");
        let second = pipeline
            .process_file(&bytes, None)
            .await
            .expect("ingest should succeed");

        assert_eq!(first.filename, second.filename);
        assert_eq!(first.artifact.path, second.artifact.path);
    }
}
