//! Directory copy and sizing helpers shared by the cache, retriever and build steps.

use crate::core::error::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Recursively copy the contents of `source` into `destination`, creating it if needed
pub fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<u64> {
    fs::create_dir_all(destination)?;
    let mut copied = 0u64;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            copied += fs::copy(entry.path(), &target)?;
        }
    }

    Ok(copied)
}

/// Total size in bytes of all regular files below `path`. Unreadable entries count as zero.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Sorted list of file paths below `root`, relative to it and using `/` separators
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(parts.join("/"));
        }
    }
    files.sort();
    Ok(files)
}

/// Join a remote, slash-separated path onto `root`, refusing anything that could escape it
pub fn safe_join(root: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = Path::new(relative);
    if relative.is_empty()
        || !candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(candidate))
}

/// Remove a directory tree if it exists
pub fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    if path.exists() {
        fs::remove_dir_all(path)?;
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_preserves_nested_files() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("src");
        fs::create_dir_all(source.join("a/b")).unwrap();
        fs::write(source.join("top.txt"), "top").unwrap();
        fs::write(source.join("a/b/deep.txt"), "deep!").unwrap();

        let destination = temp.path().join("dst");
        let bytes = copy_dir_recursive(&source, &destination).unwrap();

        assert_eq!(bytes, 8);
        assert_eq!(fs::read_to_string(destination.join("a/b/deep.txt")).unwrap(), "deep!");
        assert_eq!(list_files(&destination).unwrap(), vec!["a/b/deep.txt", "top.txt"]);
        assert_eq!(directory_size(&destination), 8);
    }

    #[test]
    fn test_safe_join_rejects_escapes() {
        let root = Path::new("/tmp/root");
        assert_eq!(
            safe_join(root, "modules/x.yaml"),
            Some(PathBuf::from("/tmp/root/modules/x.yaml"))
        );
        assert_eq!(safe_join(root, "../etc/passwd"), None);
        assert_eq!(safe_join(root, "/etc/passwd"), None);
        assert_eq!(safe_join(root, ""), None);
    }

    #[test]
    fn test_directory_size_of_missing_path_is_zero() {
        assert_eq!(directory_size(Path::new("/definitely/not/here")), 0);
    }
}
