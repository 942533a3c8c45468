//! Delivery of retrieved archives to the host environment.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};

/// An archive body, read chunk by chunk as it arrives.
pub struct ArchiveBody {
    chunks: BoxStream<'static, Result<Bytes>>,
}

impl ArchiveBody {
    /// Wraps a stream of chunks.
    pub fn from_stream<S>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            chunks: chunks.boxed(),
        }
    }

    /// A body that is already fully in memory.
    #[must_use]
    pub fn from_bytes(bytes: Bytes) -> Self {
        Self::from_stream(stream::once(async move { Ok(bytes) }))
    }

    /// Streams the body of an HTTP response.
    #[must_use]
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::from_stream(response.bytes_stream().map(|chunk| chunk.map_err(Error::from)))
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        self.chunks.next().await
    }

    /// Reads the remaining body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error the underlying stream yields.
    pub async fn into_bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for ArchiveBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveBody").finish_non_exhaustive()
    }
}

/// Somewhere a finished archive can be handed over to the user.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Delivers `body` under the file name `name` and returns the number of
    /// bytes written.
    async fn deliver(&self, name: &str, body: ArchiveBody) -> Result<u64>;
}

/// Returns the `.part` file path for a given final path.
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes its `.part` file on drop unless committed.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl PartFile {
    const fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }

    /// Renames the part file into place.
    async fn commit(mut self, dest: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, dest).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

/// Writes archives into a directory.
///
/// Data goes to `{name}.part` first and is renamed on success, so a partially
/// written archive never appears under its final name. An existing file with
/// the same name is replaced.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Final path an archive named `name` is written to.
    #[must_use]
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn deliver(&self, name: &str, mut body: ArchiveBody) -> Result<u64> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let dest = self.path_for(name);
        let part = PartFile::new(part_path(&dest));

        let mut file = tokio::fs::File::create(&part.path).await?;
        let mut written = 0u64;
        while let Some(chunk) = body.next_chunk().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        part.commit(&dest).await?;
        log::info!("Saved {} ({written} bytes)", dest.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn deliver_writes_final_file_only() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());

        let written = sink
            .deliver("out.zip", ArchiveBody::from_bytes(Bytes::from_static(b"PK")))
            .await
            .unwrap();

        let dest = dir.path().join("out.zip");
        assert_eq!(written, 2);
        assert_eq!(std::fs::read(&dest).unwrap(), b"PK");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn deliver_writes_every_chunk_in_order() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        let chunks = vec![
            Ok(Bytes::from_static(b"PK")),
            Ok(Bytes::from_static(b"\x03\x04")),
            Ok(Bytes::from_static(b"rest")),
        ];

        let written = sink
            .deliver("out.zip", ArchiveBody::from_stream(stream::iter(chunks)))
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(
            std::fs::read(dir.path().join("out.zip")).unwrap(),
            b"PK\x03\x04rest"
        );
    }

    #[tokio::test]
    async fn interrupted_body_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());
        let chunks = vec![
            Ok(Bytes::from_static(b"PK")),
            Err(Error::Transport("connection reset".into())),
        ];

        let err = sink
            .deliver("out.zip", ArchiveBody::from_stream(stream::iter(chunks)))
            .await
            .unwrap_err();

        assert!(err.is_transport());
        let dest = dir.path().join("out.zip");
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn into_bytes_joins_chunks() {
        let body = ArchiveBody::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]));
        assert_eq!(&body.into_bytes().await.unwrap()[..], b"abcd");
    }

    #[tokio::test]
    async fn deliver_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        let sink = DirectorySink::new(&nested);

        sink.deliver("x.zip", ArchiveBody::from_bytes(Bytes::from_static(b"1")))
            .await
            .unwrap();
        assert!(nested.join("x.zip").exists());
    }

    #[tokio::test]
    async fn deliver_replaces_existing_archive() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.zip"), b"old").unwrap();
        let sink = DirectorySink::new(dir.path());

        sink.deliver("x.zip", ArchiveBody::from_bytes(Bytes::from_static(b"new")))
            .await
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("x.zip")).unwrap(), b"new");
    }

    #[test]
    fn uncommitted_part_file_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.zip.part");
        std::fs::write(&path, b"partial").unwrap();

        drop(PartFile::new(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("dir/a.zip")),
            PathBuf::from("dir/a.zip.part")
        );
    }
}
