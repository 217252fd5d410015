//! [`HostFs`] over the local filesystem.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::core::locator::ResourceLocator;
use crate::io::host::{FileStat, FileType, HostFs};

/// Serves `file` locators from disk. Every other scheme is unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn local_path(locator: &ResourceLocator) -> io::Result<PathBuf> {
    locator.to_file_path().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{locator} has no local path"),
        )
    })
}

fn file_type(meta: &std::fs::FileType) -> FileType {
    if meta.is_dir() {
        FileType::Directory
    } else if meta.is_file() {
        FileType::File
    } else if meta.is_symlink() {
        FileType::SymbolicLink
    } else {
        FileType::Unknown
    }
}

#[async_trait]
impl HostFs for LocalFs {
    async fn stat(&self, locator: &ResourceLocator) -> io::Result<FileStat> {
        let meta = fs::metadata(local_path(locator)?).await?;
        Ok(FileStat {
            file_type: file_type(&meta.file_type()),
            size: meta.len(),
        })
    }

    async fn read_file(&self, locator: &ResourceLocator) -> io::Result<Vec<u8>> {
        fs::read(local_path(locator)?).await
    }

    async fn write_file(&self, locator: &ResourceLocator, contents: &[u8]) -> io::Result<()> {
        fs::write(local_path(locator)?, contents).await
    }

    async fn read_directory(
        &self,
        locator: &ResourceLocator,
    ) -> io::Result<Vec<(String, FileType)>> {
        let mut entries = fs::read_dir(local_path(locator)?).await?;
        let mut listed = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = entry
                .file_type()
                .await
                .map(|meta| file_type(&meta))
                .unwrap_or(FileType::Unknown);
            listed.push((name, kind));
        }
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(listed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator(path: &std::path::Path) -> ResourceLocator {
        ResourceLocator::from_file_path(path).expect("file locator")
    }

    #[tokio::test]
    async fn write_then_read_and_stat() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = locator(&temp.path().join("get.http"));

        LocalFs.write_file(&target, b"GET /").await.expect("write");
        assert_eq!(LocalFs.read_file(&target).await.expect("read"), b"GET /");

        let stat = LocalFs.stat(&target).await.expect("stat");
        assert_eq!(stat.file_type, FileType::File);
        assert_eq!(stat.size, 5);
    }

    #[tokio::test]
    async fn lists_directory_entries_sorted() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("b.http"), "").expect("write b");
        std::fs::create_dir(temp.path().join("a")).expect("mkdir a");
        std::fs::create_dir(temp.path().join("c")).expect("mkdir c");
        std::fs::write(temp.path().join("0.http"), "").expect("write 0");

        let entries = LocalFs
            .read_directory(&locator(temp.path()))
            .await
            .expect("readdir");
        assert_eq!(
            entries,
            vec![
                ("0.http".to_string(), FileType::File),
                ("a".to_string(), FileType::Directory),
                ("b.http".to_string(), FileType::File),
                ("c".to_string(), FileType::Directory),
            ]
        );
    }

    #[tokio::test]
    async fn untitled_locator_is_unsupported() {
        let untitled = ResourceLocator::untitled("Untitled-1").expect("untitled");
        let err = LocalFs.stat(&untitled).await.expect_err("no local path");
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    }
}
