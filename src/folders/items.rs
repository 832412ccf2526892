use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use super::sort::sort_items;
use super::tree::FolderTreeStore;
use crate::drive::{DriveApi, DriveItem, FOLDER_MIME_TYPE, ROOT_ID};

/// Message surfaced to the UI when a folder listing fails. The transport
/// error goes to the log instead.
const FETCH_ERROR_MESSAGE: &str = "Couldn't load this folder.";

struct ItemsState {
    entries: Vec<DriveItem>,
    is_loading: bool,
    error: Option<String>,
    parent_id: String,
    request_token: u64,
}

impl ItemsState {
    fn initial() -> Self {
        ItemsState {
            entries: Vec::new(),
            is_loading: false,
            error: None,
            parent_id: ROOT_ID.to_string(),
            request_token: 0,
        }
    }
}

/// Loader for the entries directly inside the current folder. Overlapping
/// fetches are fenced by a monotonic request token captured at call time:
/// only the newest call's outcome may touch visible state, so an older
/// response completing late is discarded rather than overwriting fresher
/// results.
pub struct FolderItemsStore {
    drive: Arc<dyn DriveApi>,
    state: Mutex<ItemsState>,
    notify: watch::Sender<u64>,
}

impl FolderItemsStore {
    pub fn new(drive: Arc<dyn DriveApi>) -> Self {
        let (notify, _) = watch::channel(0);
        FolderItemsStore {
            drive,
            state: Mutex::new(ItemsState::initial()),
            notify,
        }
    }

    /// Fetch the entries under `parent_id` (root when `None`). Failures are
    /// recorded as a sticky error state and re-signaled to the caller; a
    /// result that has been superseded by a newer call is dropped silently.
    pub async fn fetch_items_for(&self, parent_id: Option<&str>) -> Result<(), String> {
        let parent = parent_id.unwrap_or(ROOT_ID).to_string();

        let token = {
            let mut state = self.lock();
            state.request_token += 1;
            state.parent_id = parent.clone();
            state.is_loading = true;
            state.error = None;
            state.request_token
        };
        self.bump();

        let result = self.drive.list_items(&parent).await;

        {
            let mut state = self.lock();
            if state.request_token != token {
                // A newer call owns the visible state now.
                log::debug!(
                    "Dropping stale folder listing for {} (token {} superseded by {})",
                    parent,
                    token,
                    state.request_token
                );
                return result.map(|_| ());
            }

            match &result {
                Ok(items) => {
                    state.entries = items.clone();
                    state.is_loading = false;
                }
                Err(e) => {
                    log::warn!("Failed to load folder {}: {}", parent, e);
                    state.entries.clear();
                    state.error = Some(FETCH_ERROR_MESSAGE.to_string());
                    state.is_loading = false;
                }
            }
        }
        self.bump();

        result.map(|_| ())
    }

    /// Refresh the folder the tree store currently points at. Failures are
    /// swallowed here: this runs as a background refresh and the error state
    /// is already sticky on the store.
    pub async fn refresh_current(&self, tree: &FolderTreeStore) {
        let folder_id = tree.current_folder_id();
        let parent = if folder_id == ROOT_ID {
            None
        } else {
            Some(folder_id)
        };

        if let Err(e) = self.fetch_items_for(parent.as_deref()).await {
            log::debug!("Background folder refresh failed: {}", e);
        }
    }

    /// Clear entries, error, loading flag, parent pointer and the request
    /// token. Used on session teardown.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            *state = ItemsState::initial();
        }
        self.bump();
    }

    /// Entries as fetched; use for existence checks.
    pub fn items(&self) -> Vec<DriveItem> {
        self.lock().entries.clone()
    }

    /// Entries ordered for display: folders first, collated names.
    pub fn sorted_items(&self) -> Vec<DriveItem> {
        sort_items(&self.lock().entries)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn parent_id(&self) -> String {
        self.lock().parent_id.clone()
    }

    /// Revision channel bumped after every visible state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ItemsState> {
        self.state.lock().expect("Failed to lock folder items state")
    }

    fn bump(&self) {
        self.notify.send_modify(|rev| *rev += 1);
    }
}

/// An item is a folder iff its mime type carries Drive's folder marker.
pub fn is_drive_folder(item: &DriveItem) -> bool {
    item.mime_type
        .as_deref()
        .map(|t| t.to_lowercase().contains(FOLDER_MIME_TYPE))
        .unwrap_or(false)
}
