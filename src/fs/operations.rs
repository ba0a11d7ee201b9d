use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Create an empty file at the given path, creating missing parent directories.
///
/// Fails if the file already exists.
pub fn create_file(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    Ok(())
}

/// Create a new directory at the given path, creating missing parents.
///
/// Fails if the directory already exists.
pub fn create_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(path)?;
    Ok(())
}

/// Delete a file or directory. Directories are removed recursively.
pub fn delete(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Alternative names for `dest`: `name_copy.ext`, `name_copy2.ext`, ...
pub fn collision_candidates(dest: &Path) -> impl Iterator<Item = PathBuf> {
    let parent = dest.parent().unwrap_or(Path::new(".")).to_path_buf();
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().to_string());

    (1..=1000).map(move |i| {
        let suffix = if i == 1 {
            "_copy".to_string()
        } else {
            format!("_copy{}", i)
        };
        let new_name = match &ext {
            Some(e) => format!("{}{}.{}", stem, suffix, e),
            None => format!("{}{}", stem, suffix),
        };
        parent.join(new_name)
    })
}

/// Resolve a name collision by appending `_copy`, `_copy2`, etc.
///
/// Returns a path that does not exist yet in the destination directory.
pub fn resolve_collision(dest: &Path) -> PathBuf {
    if !dest.exists() {
        return dest.to_path_buf();
    }
    collision_candidates(dest)
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dest.to_path_buf())
}

/// Copy a file or directory tree from `src` to exactly `dest`.
pub fn copy_to(src: &Path, dest: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir_iterative(src, dest)
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dest)?;
        Ok(())
    }
}

/// Directory copy driven by an explicit work stack.
fn copy_dir_iterative(src: &Path, dest: &Path) -> Result<()> {
    let mut stack = vec![(src.to_path_buf(), dest.to_path_buf())];
    while let Some((from, to)) = stack.pop() {
        fs::create_dir_all(&to)?;
        for entry in fs::read_dir(&from)? {
            let entry = entry?;
            let src_path = entry.path();
            let dest_path = to.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                stack.push((src_path, dest_path));
            } else {
                fs::copy(&src_path, &dest_path)?;
            }
        }
    }
    Ok(())
}

/// Move a file or directory from `src` to exactly `dest`.
///
/// Uses `fs::rename` first (fast, same-device). Falls back to copy+delete
/// if rename fails (cross-device).
pub fn move_to(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_to(src, dest)?;
            delete(src)
        }
    }
}

/// Whether `path` is `ancestor` itself or lies underneath it.
pub fn is_within(path: &Path, ancestor: &Path) -> bool {
    path.starts_with(ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_a_file() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("test.txt");
        create_file(&file_path).unwrap();
        assert!(file_path.exists());
    }

    #[test]
    fn create_file_with_missing_parents() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("a").join("b").join("c.txt");
        create_file(&file_path).unwrap();
        assert!(file_path.is_file());
    }

    #[test]
    fn create_file_existing_fails() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("existing.txt");
        fs::write(&file_path, "keep me").unwrap();
        assert!(create_file(&file_path).is_err());
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "keep me");
    }

    #[test]
    fn creates_a_directory() {
        let tmp = TempDir::new().unwrap();
        let dir_path = tmp.path().join("subdir");
        create_dir(&dir_path).unwrap();
        assert!(dir_path.is_dir());
    }

    #[test]
    fn create_dir_already_exists_fails() {
        let tmp = TempDir::new().unwrap();
        let dir_path = tmp.path().join("dup");
        create_dir(&dir_path).unwrap();
        assert!(create_dir(&dir_path).is_err());
    }

    #[test]
    fn delete_file() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("delete_me.txt");
        create_file(&file_path).unwrap();
        delete(&file_path).unwrap();
        assert!(!file_path.exists());
    }

    #[test]
    fn delete_directory_recursively() {
        let tmp = TempDir::new().unwrap();
        let dir_path = tmp.path().join("parent");
        let nested_dir = dir_path.join("child");
        fs::create_dir_all(&nested_dir).unwrap();
        fs::File::create(nested_dir.join("file.txt")).unwrap();
        fs::File::create(dir_path.join("root_file.txt")).unwrap();

        delete(&dir_path).unwrap();
        assert!(!dir_path.exists());
    }

    #[test]
    fn delete_nonexistent_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(delete(&tmp.path().join("no_such_file.txt")).is_err());
    }

    #[test]
    fn copy_file_to_dest() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.txt");
        fs::write(&src, "hello").unwrap();
        let dest = tmp.path().join("dest").join("src.txt");

        copy_to(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
        assert!(src.exists());
    }

    #[test]
    fn copy_directory_tree() {
        let tmp = TempDir::new().unwrap();
        let src_dir = tmp.path().join("src_dir");
        fs::create_dir(&src_dir).unwrap();
        fs::write(src_dir.join("a.txt"), "aaa").unwrap();
        fs::create_dir(src_dir.join("sub")).unwrap();
        fs::write(src_dir.join("sub").join("b.txt"), "bbb").unwrap();

        let dest = tmp.path().join("dest").join("src_dir");
        copy_to(&src_dir, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "aaa");
        assert_eq!(
            fs::read_to_string(dest.join("sub").join("b.txt")).unwrap(),
            "bbb"
        );
    }

    #[test]
    fn move_file() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("move_me.txt");
        fs::write(&src, "content").unwrap();
        let dest = tmp.path().join("dest").join("moved.txt");

        move_to(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "content");
    }

    #[test]
    fn move_directory() {
        let tmp = TempDir::new().unwrap();
        let src_dir = tmp.path().join("move_dir");
        fs::create_dir(&src_dir).unwrap();
        fs::write(src_dir.join("inner.txt"), "data").unwrap();
        let dest = tmp.path().join("dest").join("move_dir");

        move_to(&src_dir, &dest).unwrap();
        assert!(dest.join("inner.txt").exists());
        assert!(!src_dir.exists());
    }

    #[test]
    fn resolve_collision_no_conflict() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("new.txt");
        assert_eq!(resolve_collision(&path), path);
    }

    #[test]
    fn resolve_collision_appends_suffix() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("file.txt"), "").unwrap();
        fs::write(tmp.path().join("file_copy.txt"), "").unwrap();
        assert_eq!(
            resolve_collision(&tmp.path().join("file.txt")),
            tmp.path().join("file_copy2.txt")
        );
    }

    #[test]
    fn resolve_collision_no_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Makefile");
        fs::write(&path, "").unwrap();
        assert_eq!(resolve_collision(&path), tmp.path().join("Makefile_copy"));
    }

    #[test]
    fn is_within_checks_ancestry() {
        assert!(is_within(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_within(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_within(Path::new("/a/bc"), Path::new("/a/b")));
    }
}
