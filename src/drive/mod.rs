use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod auth;
pub mod client;

pub use auth::{auth_url, SavedToken, TokenStore};
pub use client::GoogleDriveClient;

/// Sentinel id for the account's top-level container. It is never present in
/// a fetched folder listing; the stores synthesize it locally.
pub const ROOT_ID: &str = "root";

/// Display label for the synthesized root folder.
pub const ROOT_LABEL: &str = "My Drive";

/// Mime type Drive uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A folder as reported by the Drive folder inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    /// Parent folder ids. Drive allows several; only the first is used for
    /// breadcrumb and parent navigation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

impl DriveFolder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        DriveFolder {
            id: id.into(),
            name: name.into(),
            parents: Vec::new(),
            modified_time: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parents.push(parent_id.into());
        self
    }
}

/// An entry inside a folder: folders and files side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Size in bytes. Drive reports this as a decimal string on the wire.
    #[serde(default, deserialize_with = "de_size", skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl DriveItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        DriveItem {
            id: id.into(),
            name: name.into(),
            parents: Vec::new(),
            modified_time: None,
            mime_type: None,
            size: None,
            icon_link: None,
            thumbnail_link: None,
            web_view_link: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

fn de_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeRepr {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<SizeRepr>::deserialize(deserializer)? {
        Some(SizeRepr::Number(n)) => Some(n),
        Some(SizeRepr::Text(s)) => s.parse().ok(),
        None => None,
    })
}

/// Remote identifiers returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveUpload {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

/// The remote drive collaborator as the stores and the ingestion pipeline see
/// it. Implemented by [`GoogleDriveClient`] for real accounts and by
/// in-memory stubs in tests.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Full folder inventory for the account.
    async fn list_folders(&self) -> Result<Vec<DriveFolder>, String>;

    /// Direct children of a folder ([`ROOT_ID`] for the account root).
    async fn list_items(&self, parent_id: &str) -> Result<Vec<DriveItem>, String>;

    /// Create a folder, reusing an existing folder of the same name under the
    /// same parent if one exists.
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFolder, String>;

    /// Upload raw bytes as a file inside `folder_id` (account root if `None`).
    async fn upload_bytes(
        &self,
        bytes: Bytes,
        filename: &str,
        mime_type: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveUpload, String>;

    /// Whether a usable session exists. Cheap; called before every upload.
    fn is_authenticated(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drive_item_parses_string_size() {
        let item: DriveItem = serde_json::from_str(
            r#"{"id":"f1","name":"photo.webp","mimeType":"image/webp","size":"20480"}"#,
        )
        .expect("item should parse");
        assert_eq!(item.size, Some(20480));
        assert_eq!(item.mime_type.as_deref(), Some("image/webp"));
    }

    #[test]
    fn drive_item_parses_numeric_size() {
        let item: DriveItem =
            serde_json::from_str(r#"{"id":"f1","name":"photo.webp","size":512}"#)
                .expect("item should parse");
        assert_eq!(item.size, Some(512));
    }

    #[test]
    fn drive_item_tolerates_missing_fields() {
        let item: DriveItem = serde_json::from_str(r#"{"id":"f1","name":"Docs"}"#)
            .expect("item should parse");
        assert_eq!(item.size, None);
        assert!(item.parents.is_empty());
        assert!(item.modified_time.is_none());
    }

    #[test]
    fn drive_folder_round_trips_camel_case() {
        let folder: DriveFolder = serde_json::from_str(
            r#"{"id":"a","name":"Docs","parents":["root"],"modifiedTime":"2024-03-01T10:00:00Z"}"#,
        )
        .expect("folder should parse");
        assert_eq!(folder.parents, vec!["root".to_string()]);

        let json = serde_json::to_string(&folder).expect("folder should serialize");
        assert!(json.contains("modifiedTime"));
    }
}
