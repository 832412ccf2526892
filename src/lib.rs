//! Folder-aware image ingestion for a Google Drive account: browse the
//! account's folder tree with race-safe listings, drop images in, and get
//! back bounded, WebP-transcoded artifacts that are spooled locally and
//! uploaded to the chosen folder on a best-effort basis.

pub mod config;
pub mod drive;
pub mod folders;
pub mod ingest;
pub mod session;

pub use config::{DriveConfig, ImageConfig};
pub use drive::{
    DriveApi, DriveFolder, DriveItem, DriveUpload, GoogleDriveClient, ROOT_ID, ROOT_LABEL,
};
pub use folders::{is_drive_folder, sort_items, FolderItemsStore, FolderTreeStore};
pub use ingest::{
    ArtifactStore, BatchSummary, IncomingFile, IngestedImage, IngestionPipeline,
    UploadResultLedger, UploadStatus,
};
pub use session::DriveSession;
