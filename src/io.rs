use camino::Utf8Path;
use tokio::fs;

use crate::error::BundleError;

/// Create the directory along with any missing ancestors.
pub(crate) async fn ensure_dir(path: &Utf8Path) -> Result<(), BundleError> {
    fs::create_dir_all(path)
        .await
        .map_err(BundleError::io(path))
}

/// Remove everything inside `path`, keeping the directory itself. Stops at
/// the first entry that can't be removed.
pub(crate) async fn clean_dir(path: &Utf8Path) -> Result<(), BundleError> {
    let mut entries = match fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!("Error cleaning directory {path}: {err}");
            return Err(BundleError::io(path)(err));
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::error!("Error cleaning directory {path}: {err}");
                return Err(BundleError::io(path)(err));
            }
        };

        // Symlinks are unlinked, never followed.
        let file = entry.path();
        let result = match entry.file_type().await {
            Ok(kind) if kind.is_dir() => fs::remove_dir_all(&file).await,
            Ok(_) => fs::remove_file(&file).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            tracing::error!(
                "Error cleaning directory {path}: couldn't remove {}: {err}",
                file.display()
            );
            return Err(BundleError::io(file)(err));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_clean_dir_keeps_root() {
        let (_tmp, root) = scratch();
        let out = root.join("out");
        std::fs::create_dir_all(out.join("chunks/nested")).unwrap();
        std::fs::write(out.join("handler.js"), "x").unwrap();
        std::fs::write(out.join("chunks/nested/a.js"), "y").unwrap();

        clean_dir(&out).await.unwrap();

        assert!(out.is_dir());
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clean_dir_missing() {
        let (_tmp, root) = scratch();
        let missing = root.join("nope");

        let err = clean_dir(&missing).await.unwrap_err();
        assert!(matches!(err, BundleError::Io { ref path, .. } if path == missing.as_std_path()));
        assert!(!missing.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_dir_unlinks_symlinks() {
        use std::os::unix::fs::symlink;

        let (_tmp, root) = scratch();
        let out = root.join("out");
        let shared = root.join("shared");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::create_dir_all(&shared).unwrap();
        std::fs::write(shared.join("keep.js"), "z").unwrap();

        symlink(root.join("gone.js"), out.join("dangling")).unwrap();
        symlink(&shared, out.join("shared")).unwrap();

        clean_dir(&out).await.unwrap();

        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
        assert!(shared.join("keep.js").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_dir_reports_failed_entry() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, root) = scratch();
        let out = root.join("out");
        let locked = out.join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("a.js"), "x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits don't bind privileged users.
        let enforced = std::fs::write(locked.join("canary"), "").is_err();

        let result = clean_dir(&out).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !enforced {
            return;
        }

        let err = result.unwrap_err();
        assert!(matches!(err, BundleError::Io { ref path, .. } if path == locked.as_std_path()));
        assert!(out.is_dir());
        assert!(locked.join("a.js").is_file());
    }

    #[tokio::test]
    async fn test_ensure_dir_idempotent() {
        let (_tmp, root) = scratch();
        let out = root.join("a/b/c");

        ensure_dir(&out).await.unwrap();
        ensure_dir(&out).await.unwrap();

        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn test_ensure_dir_over_file() {
        let (_tmp, root) = scratch();
        let file = root.join("taken");
        std::fs::write(&file, "").unwrap();

        let err = ensure_dir(&file).await.unwrap_err();
        assert!(matches!(err, BundleError::Io { .. }));
    }
}
