use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::items::is_drive_folder;
use crate::drive::DriveItem;

/// Sort entries for display: folders before files, each group ordered by a
/// case- and diacritic-insensitive collation of the name. Entries with
/// identical keys keep their incoming order (the sorts are stable); beyond
/// that, duplicate-name order is unspecified.
pub fn sort_items(items: &[DriveItem]) -> Vec<DriveItem> {
    let (mut folders, mut files): (Vec<DriveItem>, Vec<DriveItem>) =
        items.iter().cloned().partition(is_drive_folder);

    folders.sort_by_cached_key(|item| collation_key(&item.name));
    files.sort_by_cached_key(|item| collation_key(&item.name));

    folders.extend(files);
    folders
}

/// Fold a name for comparison: NFD-decompose, drop combining marks, then
/// lowercase. Hangul decomposes to jamo, so mixed Korean/Latin listings
/// order consistently, with Latin names first.
pub fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
