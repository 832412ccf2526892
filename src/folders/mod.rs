pub mod items;
pub mod sort;
pub mod tree;

pub use items::{is_drive_folder, FolderItemsStore};
pub use sort::sort_items;
pub use tree::FolderTreeStore;
