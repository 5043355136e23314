use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Replaces `path` with `bytes` through a sibling temp file, so readers see
/// either the old contents or the new ones.
pub(crate) fn replace_file_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_temp_path(path);
    if let Err(error) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn sibling_temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("leaderboard");
    let tmp_name = format!(".{file_name}.{}.tmp", std::process::id());
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn replaces_existing_file_and_leaves_no_temp_behind() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("scores.json");
        fs::write(&path, b"old").expect("seed file");

        replace_file_atomic(&path, b"new").expect("replace");

        assert_eq!(fs::read(&path).expect("read back"), b"new");
        let entries = fs::read_dir(dir.path()).expect("list").count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("deeper").join("scores.json");

        replace_file_atomic(&path, b"{}").expect("write");
        assert_eq!(fs::read(&path).expect("read back"), b"{}");
    }
}
