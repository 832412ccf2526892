use std::sync::Arc;

use crate::drive::{DriveApi, DriveFolder, ROOT_ID};
use crate::folders::{FolderItemsStore, FolderTreeStore};

/// Wires one drive account to its folder stores for the lifetime of a
/// session: tree refreshes, navigation with item fetches, folder creation
/// followed by re-navigation, and combined teardown. Construct one per
/// session and pass it explicitly; the stores are reachable for direct
/// reads and subscriptions.
pub struct DriveSession {
    drive: Arc<dyn DriveApi>,
    tree: FolderTreeStore,
    items: FolderItemsStore,
}

impl DriveSession {
    pub fn new(drive: Arc<dyn DriveApi>) -> Self {
        let items = FolderItemsStore::new(drive.clone());
        DriveSession {
            drive,
            tree: FolderTreeStore::new(),
            items,
        }
    }

    pub fn tree(&self) -> &FolderTreeStore {
        &self.tree
    }

    pub fn items(&self) -> &FolderItemsStore {
        &self.items
    }

    /// Reload the account's folder inventory into the tree store.
    pub async fn refresh_folder_tree(&self) -> Result<Vec<DriveFolder>, String> {
        let folders = self.drive.list_folders().await?;
        self.tree.set_folders(folders.clone());
        Ok(folders)
    }

    /// Re-fetch the entries of the folder currently selected in the tree.
    /// Fetch failures stay on the items store rather than propagating.
    pub async fn refresh_current_items(&self) {
        self.items.refresh_current(&self.tree).await;
    }

    /// Folder inventory and current-folder entries in one go.
    pub async fn sync(&self) -> Result<(), String> {
        self.refresh_folder_tree().await?;
        self.refresh_current_items().await;
        Ok(())
    }

    /// Move the selection and fetch the new folder's entries. The fetch
    /// error (if any) is re-signaled; it is also sticky on the items store.
    pub async fn navigate(&self, folder_id: Option<&str>) -> Result<(), String> {
        self.tree.navigate_to(folder_id);
        self.fetch_for_current().await
    }

    /// Step to the current folder's primary parent and fetch its entries.
    pub async fn navigate_to_parent(&self) -> Result<(), String> {
        self.tree.navigate_to_parent();
        self.fetch_for_current().await
    }

    /// Create (or reuse) a folder, refresh the inventory, then navigate into
    /// the new folder so uploads target it.
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<DriveFolder, String> {
        let folder = self.drive.create_folder(name, parent_id).await?;
        self.refresh_folder_tree().await?;
        self.navigate(Some(&folder.id)).await?;
        Ok(folder)
    }

    /// Tear down all session state: folder set, selection and item listing.
    pub fn clear(&self) {
        self.tree.reset();
        self.items.reset();
    }

    async fn fetch_for_current(&self) -> Result<(), String> {
        let current = self.tree.current_folder_id();
        let parent = if current == ROOT_ID {
            None
        } else {
            Some(current)
        };
        self.items.fetch_items_for(parent.as_deref()).await
    }
}
