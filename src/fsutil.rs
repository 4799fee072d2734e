//! Filesystem helpers shared by the catalog writer and the source rewriter.

use std::io;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Names tried before giving up on a temp file.
const TEMP_ATTEMPTS: usize = 16;
/// Distinguishes temp files of one process.
static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Overwrites `path` with `contents` by writing a hidden sibling temp file and
/// renaming it over the target. Parent directories are created as needed.
pub async fn write_replace(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let (temp_path, mut file) = create_temp(path).await?;
    let written = async {
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await
    }
    .await;
    drop(file);
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Creates `.<name>.tmp.<pid>.<n>` next to `path`, never reusing an existing file.
async fn create_temp(path: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path does not include a file name")
    })?;

    for _ in 0..TEMP_ATTEMPTS {
        let attempt = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let temp_path =
            path.with_file_name(format!(".{file_name}.tmp.{}.{attempt}", std::process::id()));
        match fs::OpenOptions::new().write(true).create_new(true).open(&temp_path).await {
            Ok(file) => return Ok((temp_path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(io::ErrorKind::AlreadyExists, "failed to allocate a temporary file"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[rstest]
    #[tokio::test]
    async fn test_write_replace_creates_parents_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("zh").join("common.json");

        write_replace(&target, "{\"a\": \"1\", \"b\": \"2\"}").await.unwrap();
        write_replace(&target, "{}").await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
        assert_eq!(file_names(&temp_dir.path().join("zh")), vec!["common.json"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_write_replace_leaves_tmp_named_siblings_alone() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("common.json");
        let sibling = temp_dir.path().join("common.json.tmp");
        std::fs::write(&sibling, "keep me").unwrap();

        write_replace(&target, "{}").await.unwrap();

        assert_eq!(std::fs::read_to_string(&sibling).unwrap(), "keep me");
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "{}");
        assert_eq!(file_names(temp_dir.path()), vec!["common.json", "common.json.tmp"]);
    }
}
