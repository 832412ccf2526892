use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::{DriveApi, DriveFolder, DriveItem, DriveUpload, TokenStore, FOLDER_MIME_TYPE};
use crate::config::DriveConfig;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";

const FOLDER_FIELDS: &str = "files(id,name,parents,modifiedTime)";
const ITEM_FIELDS: &str =
    "files(id,name,mimeType,size,modifiedTime,parents,iconLink,thumbnailLink,webViewLink)";

#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct FileList<T> {
    #[serde(default)]
    files: Vec<T>,
}

/// Google Drive REST client operating on a saved OAuth token.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    tokens: TokenStore,
    config: DriveConfig,
}

impl GoogleDriveClient {
    pub fn new(config: DriveConfig) -> Result<Self, String> {
        Ok(GoogleDriveClient {
            http: reqwest::Client::new(),
            tokens: TokenStore::new()?,
            config,
        })
    }

    /// Client backed by an explicit token store, for tests and custom setups.
    pub fn with_token_store(config: DriveConfig, tokens: TokenStore) -> Self {
        GoogleDriveClient {
            http: reqwest::Client::new(),
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    fn access_token(&self) -> Result<String, String> {
        self.tokens
            .load()
            .map(|t| t.access_token)
            .ok_or_else(|| {
                "Not connected to Google Drive. Complete authentication first.".to_string()
            })
    }

    async fn list_files<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        fields: &str,
        order_by: Option<&str>,
        page_size: u32,
    ) -> Result<Vec<T>, String> {
        let token = self.access_token()?;

        let mut params = vec![
            ("q".to_string(), query.to_string()),
            ("fields".to_string(), fields.to_string()),
            ("pageSize".to_string(), page_size.to_string()),
        ];
        if let Some(order) = order_by {
            params.push(("orderBy".to_string(), order.to_string()));
        }

        let response = self
            .http
            .get(FILES_URL)
            .query(&params)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| format!("Drive listing request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Drive listing failed with status {}: {}", status, body));
        }

        let list: FileList<T> = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Drive listing: {}", e))?;

        Ok(list.files)
    }
}

/// Escape a value for interpolation into a Drive query string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn list_folders(&self) -> Result<Vec<DriveFolder>, String> {
        let query = format!("mimeType='{}' and trashed=false", FOLDER_MIME_TYPE);
        let folders = self
            .list_files(&query, FOLDER_FIELDS, Some("name"), 100)
            .await?;
        log::info!("Listed {} Drive folders", folders.len());
        Ok(folders)
    }

    async fn list_items(&self, parent_id: &str) -> Result<Vec<DriveItem>, String> {
        let query = format!("'{}' in parents and trashed=false", escape_query(parent_id));
        let items = self.list_files(&query, ITEM_FIELDS, None, 1000).await?;
        log::info!("Listed {} items under folder {}", items.len(), parent_id);
        Ok(items)
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFolder, String> {
        let token = self.access_token()?;

        // Reuse an existing folder of the same name under the same parent.
        let mut query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME_TYPE,
            escape_query(name)
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", escape_query(parent)));
        }

        let existing: Vec<DriveFolder> = self.list_files(&query, FOLDER_FIELDS, None, 1).await?;
        if let Some(folder) = existing.into_iter().next() {
            log::info!("Reusing existing Drive folder '{}' ({})", folder.name, folder.id);
            return Ok(folder);
        }

        let mut metadata = serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = serde_json::json!([parent]);
        }

        let response = self
            .http
            .post(FILES_URL)
            .query(&[("fields", "id,name,parents,modifiedTime")])
            .bearer_auth(&token)
            .header("Content-Type", "application/json")
            .body(metadata.to_string())
            .send()
            .await
            .map_err(|e| format!("Failed to create folder: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Create folder failed with status {}: {}", status, body));
        }

        let folder: DriveFolder = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse create folder response: {}", e))?;

        log::info!("Created Drive folder '{}' ({})", folder.name, folder.id);
        Ok(folder)
    }

    async fn upload_bytes(
        &self,
        bytes: Bytes,
        filename: &str,
        mime_type: &str,
        folder_id: Option<&str>,
    ) -> Result<DriveUpload, String> {
        let token = self.access_token()?;

        // Folder priority: explicit argument, then the configured default.
        let target_folder = folder_id
            .map(str::to_string)
            .or_else(|| self.config.default_folder_id.clone());

        let mut metadata = serde_json::json!({ "name": filename });
        if let Some(folder) = &target_folder {
            metadata["parents"] = serde_json::json!([folder]);
        }

        // Drive's multipart upload wants multipart/related, which reqwest's
        // form support does not produce; build the body by hand.
        let boundary = format!("picdrop_{}", Uuid::new_v4().simple());

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
        body.extend_from_slice(&bytes);
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        let response = self
            .http
            .post(format!("{}&fields=id,name,webViewLink", UPLOAD_URL))
            .bearer_auth(&token)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={}", boundary),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| format!("Failed to upload file: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Upload failed with status {}: {}", status, body));
        }

        let upload: DriveUpload = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse upload response: {}", e))?;

        log::info!("Uploaded {} to Drive as {}", filename, upload.id);
        Ok(upload)
    }

    fn is_authenticated(&self) -> bool {
        self.tokens.is_authenticated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn escape_query_handles_quotes() {
        assert_eq!(escape_query("it's"), "it\\'s");
        assert_eq!(escape_query("back\\slash"), "back\\\\slash");
        assert_eq!(escape_query("plain"), "plain");
    }

    #[test]
    fn access_token_requires_saved_token() {
        let dir = tempdir().expect("Failed to create temp dir");
        let client = GoogleDriveClient::with_token_store(
            DriveConfig::default(),
            TokenStore::at(dir.path().join("token.json")),
        );

        assert!(!client.is_authenticated());
        let err = client.access_token().expect_err("should be unauthenticated");
        assert!(err.contains("Not connected"));
    }

    #[test]
    fn file_list_tolerates_missing_files_key() {
        let list: FileList<DriveFolder> = serde_json::from_str("{}").expect("should parse");
        assert!(list.files.is_empty());
    }
}
