use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;
use ws_core::{Result, WsError};

/// Kind of a walked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of the workspace tree, with the metadata the archive layer
/// needs to build tar headers.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub mtime: SystemTime,
    #[cfg(unix)]
    pub mode: u32,
}

/// All file operations of the companion, confined to one root directory.
///
/// Every client-supplied path goes through [`FileStore::resolve`] before it
/// touches the filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalizes a client path and joins it under the root. Rejects any
    /// path whose `..` components would climb above the root, without
    /// requiring the path to exist.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let mut stack: Vec<&std::ffi::OsStr> = Vec::new();
        for component in Path::new(raw.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => stack.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if stack.pop().is_none() {
                        return Err(WsError::PathValidation(format!(
                            "path escapes workspace root: {raw}"
                        )));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(WsError::PathValidation(format!(
                        "absolute path not allowed: {raw}"
                    )));
                }
            }
        }
        let mut resolved = self.root.clone();
        resolved.extend(stack);
        Ok(resolved)
    }

    /// Creates an empty file at `raw`, with any missing parent directories.
    /// Re-creating an existing file is a no-op that keeps its content.
    pub fn create_file(&self, raw: &str) -> Result<()> {
        let path = self.resolve(raw)?;
        if path == self.root {
            return Err(WsError::StructuralConflict(
                "cannot create a file at the workspace root".to_string(),
            ));
        }
        if path.is_dir() {
            return Err(WsError::StructuralConflict(format!(
                "directory exists at {raw}"
            )));
        }
        self.ensure_parent(&path, raw)?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(())
    }

    /// Creates missing parents, classifying a file in the parent chain as a
    /// structural conflict rather than an opaque I/O failure.
    fn ensure_parent(&self, path: &Path, raw: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => {
                    WsError::StructuralConflict(format!(
                        "parent of {raw} is not a directory"
                    ))
                }
                _ => WsError::Io(e),
            })?;
        }
        Ok(())
    }

    /// Creates a directory (and missing parents). Idempotent.
    pub fn create_dir(&self, raw: &str) -> Result<()> {
        let path = self.resolve(raw)?;
        if path.is_file() {
            return Err(WsError::StructuralConflict(format!(
                "file exists at {raw}"
            )));
        }
        fs::create_dir_all(&path).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists | io::ErrorKind::NotADirectory => {
                WsError::StructuralConflict(format!("file in the path of {raw}"))
            }
            _ => WsError::Io(e),
        })?;
        Ok(())
    }

    /// Writes content to `raw`, creating the file and missing parents.
    pub fn write_file(&self, raw: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(raw)?;
        if path.is_dir() {
            return Err(WsError::StructuralConflict(format!(
                "directory exists at {raw}"
            )));
        }
        self.ensure_parent(&path, raw)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Reads a regular file. Directories and absent paths are not found.
    pub fn read_file(&self, raw: &str) -> Result<Vec<u8>> {
        let path = self.resolve(raw)?;
        if !path.is_file() {
            return Err(WsError::not_found(raw));
        }
        Ok(fs::read(&path)?)
    }

    /// Deletes a file or a directory subtree. Absent paths are an error so
    /// clients can distinguish a miss from a delete.
    pub fn delete(&self, raw: &str) -> Result<()> {
        let path = self.resolve(raw)?;
        if path == self.root {
            return Err(WsError::StructuralConflict(
                "cannot delete the workspace root".to_string(),
            ));
        }
        let meta = fs::symlink_metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WsError::not_found(raw)
            } else {
                WsError::Io(e)
            }
        })?;
        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Removes every entry under the root while keeping the root itself.
    pub fn purge(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Walks the tree depth-first and returns every entry except the root,
    /// sorted by relative path for deterministic archives.
    pub fn walk(&self) -> Result<Vec<FileEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| WsError::Other(anyhow::Error::new(e)))?;
            let meta = entry
                .metadata()
                .map_err(|e| WsError::Other(anyhow::Error::new(e)))?;
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|e| WsError::PathValidation(e.to_string()))?;
            let rel = rel
                .to_str()
                .ok_or_else(|| {
                    WsError::PathValidation(format!("non-utf8 path: {:?}", entry.path()))
                })?
                .replace(std::path::MAIN_SEPARATOR, "/");
            entries.push(FileEntry {
                path: rel,
                kind: if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: meta.len(),
                mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                #[cfg(unix)]
                mode: {
                    use std::os::unix::fs::PermissionsExt;
                    meta.permissions().mode()
                },
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

/// Content type used when serving a file for download. Images keep their
/// type so browsers can render them inline; everything else is forced to a
/// type that cannot execute in the browser.
pub fn download_mime(raw: &str, content: &[u8]) -> &'static str {
    let ext = Path::new(raw)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        _ => {
            if std::str::from_utf8(content).is_ok() {
                "text/plain; charset=utf-8"
            } else {
                "application/octet-stream"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn resolve_rejects_escapes() {
        let (_dir, store) = store();
        assert!(store.resolve("../outside").is_err());
        assert!(store.resolve("a/../../outside").is_err());
        assert!(store.resolve("a/b/../../../outside").is_err());
    }

    #[test]
    fn resolve_normalizes_inner_dotdot() {
        let (_dir, store) = store();
        let resolved = store.resolve("a/b/../c").unwrap();
        assert_eq!(resolved, store.root().join("a/c"));
        // Leading slash is treated as root-relative, not absolute.
        assert_eq!(store.resolve("/a/c").unwrap(), store.root().join("a/c"));
    }

    #[test]
    fn create_file_is_idempotent_and_keeps_content() {
        let (_dir, store) = store();
        store.write_file("a/b.txt", b"hi").unwrap();
        store.create_file("a/b.txt").unwrap();
        assert_eq!(store.read_file("a/b.txt").unwrap(), b"hi");
    }

    #[test]
    fn create_file_conflicts_with_directory() {
        let (_dir, store) = store();
        store.create_dir("a").unwrap();
        assert!(matches!(
            store.create_file("a").unwrap_err(),
            WsError::StructuralConflict(_)
        ));
        store.create_file("a/b.txt").unwrap();
        assert!(matches!(
            store.create_dir("a/b.txt").unwrap_err(),
            WsError::StructuralConflict(_)
        ));
    }

    #[test]
    fn delete_removes_directory_subtree() {
        let (_dir, store) = store();
        store.write_file("a/b/c.txt", b"x").unwrap();
        store.delete("a").unwrap();
        assert!(store.read_file("a/b/c.txt").is_err());
        assert!(store.walk().unwrap().is_empty());
    }

    #[test]
    fn delete_of_absent_path_is_not_found() {
        let (_dir, store) = store();
        assert!(store.delete("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn purge_keeps_the_root() {
        let (_dir, store) = store();
        store.write_file("a.txt", b"x").unwrap();
        store.create_dir("d/e").unwrap();
        store.purge().unwrap();
        assert!(store.root().is_dir());
        assert!(store.walk().unwrap().is_empty());
    }

    #[test]
    fn walk_lists_entries_sorted() {
        let (_dir, store) = store();
        store.write_file("b.txt", b"bb").unwrap();
        store.write_file("a/x.txt", b"x").unwrap();
        let entries = store.walk().unwrap();
        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/x.txt", "b.txt"]);
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[2].size, 2);
    }

    #[test]
    fn download_mime_forces_safe_types() {
        assert_eq!(download_mime("logo.png", b"\x89PNG"), "image/png");
        assert_eq!(
            download_mime("index.html", b"<html></html>"),
            "text/plain; charset=utf-8"
        );
        assert_eq!(
            download_mime("blob.bin", &[0xff, 0xfe, 0x00, 0x01]),
            "application/octet-stream"
        );
    }
}
