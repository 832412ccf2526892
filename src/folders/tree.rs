use std::sync::Mutex;
use tokio::sync::watch;

use crate::drive::{DriveFolder, ROOT_ID, ROOT_LABEL};

/// Safety cap for parent walks; a well-formed folder set never gets near it,
/// a malformed one with a parent cycle terminates instead of spinning.
const MAX_BREADCRUMB_DEPTH: usize = 50;

/// Fallback label when the current selection is not in the folder set.
const UNKNOWN_FOLDER_LABEL: &str = "Selected folder";

struct TreeState {
    folders: Vec<DriveFolder>,
    current_folder_id: String,
    upload_target_id: Option<String>,
}

/// Session-lifetime state of the known folder set, the current location and
/// the upload target, with pure derivations over it (breadcrumb, display
/// name, parent id). Operations never perform I/O; consumers subscribe to a
/// revision channel to learn about changes.
pub struct FolderTreeStore {
    state: Mutex<TreeState>,
    notify: watch::Sender<u64>,
}

impl Default for FolderTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderTreeStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        FolderTreeStore {
            state: Mutex::new(TreeState {
                folders: Vec::new(),
                current_folder_id: ROOT_ID.to_string(),
                upload_target_id: None,
            }),
            notify,
        }
    }

    /// Replace the known folder set wholesale and repair any selection that
    /// no longer points into it.
    pub fn set_folders(&self, list: Vec<DriveFolder>) {
        {
            let mut state = self.lock();
            state.folders = list;
            ensure_valid_selection(&mut state);
        }
        self.bump();
    }

    /// Upsert folders by id without dropping folders absent from `list`,
    /// then repair selections.
    pub fn merge_folders(&self, list: Vec<DriveFolder>) {
        {
            let mut state = self.lock();
            for folder in list {
                match state.folders.iter().position(|f| f.id == folder.id) {
                    Some(idx) => state.folders[idx] = folder,
                    None => state.folders.push(folder),
                }
            }
            ensure_valid_selection(&mut state);
        }
        self.bump();
    }

    /// Move to `folder_id` (root when `None`). The upload target follows the
    /// navigation, except that root maps to no target.
    pub fn navigate_to(&self, folder_id: Option<&str>) {
        {
            let mut state = self.lock();
            let target = folder_id.unwrap_or(ROOT_ID);
            state.current_folder_id = target.to_string();
            state.upload_target_id = if target == ROOT_ID {
                None
            } else {
                Some(target.to_string())
            };
        }
        self.bump();
    }

    /// Navigate to the current folder's primary parent (root when it has
    /// none, or when the parent is not in the folder set).
    pub fn navigate_to_parent(&self) {
        let parent = {
            let state = self.lock();
            primary_parent_id(&state.folders, &state.current_folder_id)
        };
        self.navigate_to(parent.as_deref());
    }

    /// Choose the upload target directly; root is represented as no target.
    pub fn select_upload_target(&self, folder_id: Option<&str>) {
        {
            let mut state = self.lock();
            state.upload_target_id = folder_id
                .filter(|id| *id != ROOT_ID)
                .map(str::to_string);
        }
        self.bump();
    }

    /// Drop all folders and return to root.
    pub fn reset(&self) {
        {
            let mut state = self.lock();
            state.folders.clear();
            state.current_folder_id = ROOT_ID.to_string();
            state.upload_target_id = None;
        }
        self.bump();
    }

    pub fn folders(&self) -> Vec<DriveFolder> {
        self.lock().folders.clone()
    }

    pub fn current_folder_id(&self) -> String {
        self.lock().current_folder_id.clone()
    }

    pub fn upload_target_id(&self) -> Option<String> {
        self.lock().upload_target_id.clone()
    }

    pub fn is_at_root(&self) -> bool {
        self.lock().current_folder_id == ROOT_ID
    }

    /// Ancestor chain of the current folder, topmost first, excluding root.
    /// Walks first-listed parents only and stops (without error) at the
    /// first parent id absent from the folder set.
    pub fn breadcrumb(&self) -> Vec<DriveFolder> {
        let state = self.lock();
        let mut trail = Vec::new();
        let mut current_id = state.current_folder_id.clone();

        for _ in 0..MAX_BREADCRUMB_DEPTH {
            if current_id == ROOT_ID {
                break;
            }
            let Some(node) = find_folder(&state.folders, &current_id) else {
                break;
            };
            trail.push(node.clone());
            match primary_parent_id(&state.folders, &current_id) {
                Some(parent) => current_id = parent,
                None => break,
            }
        }

        trail.reverse();
        trail
    }

    /// Display name of the current folder; the root label at root.
    pub fn current_folder_name(&self) -> String {
        let state = self.lock();
        if state.current_folder_id == ROOT_ID {
            return ROOT_LABEL.to_string();
        }
        find_folder(&state.folders, &state.current_folder_id)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| UNKNOWN_FOLDER_LABEL.to_string())
    }

    /// Primary parent of the current folder: `None` at root (or when the
    /// current folder is unknown), [`ROOT_ID`] when the folder has no known
    /// parent.
    pub fn parent_folder_id(&self) -> Option<String> {
        let state = self.lock();
        primary_parent_id(&state.folders, &state.current_folder_id)
    }

    /// Revision channel bumped after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TreeState> {
        self.state.lock().expect("Failed to lock folder tree state")
    }

    fn bump(&self) {
        self.notify.send_modify(|rev| *rev += 1);
    }
}

fn find_folder<'a>(folders: &'a [DriveFolder], id: &str) -> Option<&'a DriveFolder> {
    folders.iter().find(|f| f.id == id)
}

fn primary_parent_id(folders: &[DriveFolder], folder_id: &str) -> Option<String> {
    if folder_id == ROOT_ID {
        return None;
    }
    let folder = find_folder(folders, folder_id)?;

    let Some(first) = folder.parents.first().filter(|p| !p.is_empty()) else {
        return Some(ROOT_ID.to_string());
    };

    if find_folder(folders, first).is_some() {
        Some(first.clone())
    } else {
        // Parent outside the known set: treat as attached to root.
        Some(ROOT_ID.to_string())
    }
}

fn ensure_valid_selection(state: &mut TreeState) {
    if state.current_folder_id != ROOT_ID
        && find_folder(&state.folders, &state.current_folder_id).is_none()
    {
        state.current_folder_id = ROOT_ID.to_string();
    }

    let target_valid = match &state.upload_target_id {
        Some(target) => target != ROOT_ID && find_folder(&state.folders, target).is_some(),
        None => true,
    };
    if !target_valid {
        state.upload_target_id = None;
    }
}
