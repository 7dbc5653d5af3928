//! Remote filesystem entries produced by a directory listing.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Local};
use serde::Serialize;

pub const DEFAULT_DIR_PERMISSIONS: &str = "drwxr-xr-x";
pub const DEFAULT_FILE_PERMISSIONS: &str = "-rw-r--r--";

/// One entry of a remote directory. Equality and hashing use `path` only.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub size: u64,
    pub last_modified: DateTime<Local>,
    pub permissions: String,
    pub owner: String,
    pub group: String,
    root: bool,
}

impl DirectoryEntry {
    /// Entry with synthesized metadata, for listings that only carry names.
    pub fn bare(name: impl Into<String>, path: impl Into<String>, is_directory: bool) -> Self {
        DirectoryEntry {
            name: name.into(),
            path: path.into(),
            is_directory,
            size: 0,
            last_modified: Local::now(),
            permissions: synthesized_permissions(is_directory).to_string(),
            owner: String::new(),
            group: String::new(),
            root: false,
        }
    }

    /// The `/` marker shown at the top of a browser.
    pub fn root(display_name: impl Into<String>) -> Self {
        DirectoryEntry {
            root: true,
            ..Self::bare(display_name, "/", true)
        }
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    /// `drwxr-xr-x (755)` when the mode string is complete, else the raw string.
    pub fn permissions_with_octal(&self) -> String {
        match permissions_to_octal(&self.permissions) {
            Some(octal) => format!("{} ({})", self.permissions, octal),
            None => self.permissions.clone(),
        }
    }

    pub fn owner_display(&self) -> String {
        match (self.owner.is_empty(), self.group.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.owner.clone(),
            (true, false) => self.group.clone(),
            (false, false) => format!("{}:{}", self.owner, self.group),
        }
    }

    /// `None` for `/`; `/` for top-level entries.
    pub fn parent_path(&self) -> Option<String> {
        if self.path == "/" {
            return None;
        }
        match self.path.rfind('/') {
            Some(idx) if idx > 0 => Some(self.path[..idx].to_string()),
            _ => Some("/".to_string()),
        }
    }

    pub fn formatted_size(&self) -> String {
        if self.is_directory {
            return String::new();
        }

        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        let size = self.size;
        if size < KB {
            format!("{} B", size)
        } else if size < MB {
            format!("{:.1} KB", size as f64 / KB as f64)
        } else if size < GB {
            format!("{:.1} MB", size as f64 / MB as f64)
        } else {
            format!("{:.1} GB", size as f64 / GB as f64)
        }
    }
}

impl PartialEq for DirectoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for DirectoryEntry {}

impl Hash for DirectoryEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// `parent + "/" + name`, without doubling a trailing slash.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

pub fn synthesized_permissions(is_directory: bool) -> &'static str {
    if is_directory {
        DEFAULT_DIR_PERMISSIONS
    } else {
        DEFAULT_FILE_PERMISSIONS
    }
}

/// Directories first, then case-insensitive name. Presentation helper only;
/// listings are returned unsorted.
pub fn sort_for_display(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

fn permissions_to_octal(perms: &str) -> Option<String> {
    let bytes = perms.as_bytes();
    if bytes.len() < 10 {
        return None;
    }

    let triplet = |chunk: &[u8]| {
        let mut value = 0;
        if chunk[0] == b'r' {
            value += 4;
        }
        if chunk[1] == b'w' {
            value += 2;
        }
        if chunk[2] == b'x' {
            value += 1;
        }
        value
    };

    Some(format!(
        "{}{}{}",
        triplet(&bytes[1..4]),
        triplet(&bytes[4..7]),
        triplet(&bytes[7..10])
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_by_path() {
        let a = DirectoryEntry::bare("a.txt", "/pub/a.txt", false);
        let mut b = DirectoryEntry::bare("renamed", "/pub/a.txt", true);
        b.size = 99;
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/pub", "a"), "/pub/a");
        assert_eq!(join_path("/pub/", "a"), "/pub/a");
    }

    #[test]
    fn test_root_marker() {
        let root = DirectoryEntry::root("bob@ftp.example.com:21");
        assert!(root.is_root());
        assert!(root.is_directory);
        assert_eq!(root.path, "/");
        assert_eq!(root.parent_path(), None);
        assert!(root.owner.is_empty());
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(DirectoryEntry::bare("a", "/a", false).parent_path().as_deref(), Some("/"));
        assert_eq!(
            DirectoryEntry::bare("b", "/a/b", false).parent_path().as_deref(),
            Some("/a")
        );
    }

    #[test]
    fn test_permissions_with_octal() {
        let mut e = DirectoryEntry::bare("x", "/x", true);
        assert_eq!(e.permissions_with_octal(), "drwxr-xr-x (755)");
        e.permissions = "-rw-r-----".to_string();
        assert_eq!(e.permissions_with_octal(), "-rw-r----- (640)");
        e.permissions = "rw".to_string();
        assert_eq!(e.permissions_with_octal(), "rw");
    }

    #[test]
    fn test_owner_display() {
        let mut e = DirectoryEntry::bare("x", "/x", false);
        assert_eq!(e.owner_display(), "");
        e.owner = "ftp".to_string();
        assert_eq!(e.owner_display(), "ftp");
        e.group = "users".to_string();
        assert_eq!(e.owner_display(), "ftp:users");
        e.owner.clear();
        assert_eq!(e.owner_display(), "users");
    }

    #[test]
    fn test_formatted_size() {
        let mut e = DirectoryEntry::bare("x", "/x", false);
        e.size = 512;
        assert_eq!(e.formatted_size(), "512 B");
        e.size = 1536;
        assert_eq!(e.formatted_size(), "1.5 KB");
        e.size = 5 * 1024 * 1024;
        assert_eq!(e.formatted_size(), "5.0 MB");
        e.size = 2 * 1024 * 1024 * 1024;
        assert_eq!(e.formatted_size(), "2.0 GB");

        let dir = DirectoryEntry::bare("d", "/d", true);
        assert_eq!(dir.formatted_size(), "");
    }

    #[test]
    fn test_sort_for_display() {
        let mut entries = vec![
            DirectoryEntry::bare("b.txt", "/b.txt", false),
            DirectoryEntry::bare("Zeta", "/Zeta", true),
            DirectoryEntry::bare("A.txt", "/A.txt", false),
            DirectoryEntry::bare("alpha", "/alpha", true),
        ];
        sort_for_display(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "Zeta", "A.txt", "b.txt"]);
    }
}
