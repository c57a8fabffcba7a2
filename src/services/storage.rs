use crate::error::AppError;
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Blob store rooted at a local directory. Rows in the `files` table
/// hold paths relative to this root.
pub struct StorageService {
    root: PathBuf,
}

impl StorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the on-disk layout if it does not exist yet
    pub async fn ensure_layout(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root.join("files")).await?;
        Ok(())
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// Stream `reader` to `relative` under the storage root, returning
    /// the number of bytes written.
    pub async fn write_stream<R>(&self, relative: &str, mut reader: R) -> Result<u64, AppError>
    where
        R: AsyncRead + Unpin,
    {
        let full_path = self.resolve(relative);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&full_path).await?;
        let mut buffer = [0u8; 64 * 1024];
        let mut written: u64 = 0;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n]).await?;
            written += n as u64;
        }

        file.flush().await?;
        Ok(written)
    }

    /// Open a stored blob for reading, along with its length
    pub async fn open(&self, relative: &str) -> Result<(File, u64), AppError> {
        let full_path = self.resolve(relative);
        let file = File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                tracing::error!("blob missing on disk: {}", full_path.display());
                AppError::NotFound("File not found".to_string())
            } else {
                AppError::Io(e)
            }
        })?;

        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    pub async fn delete(&self, relative: &str) -> Result<(), AppError> {
        fs::remove_file(self.resolve(relative)).await?;
        Ok(())
    }

    pub async fn exists(&self, relative: &str) -> bool {
        fs::try_exists(self.resolve(relative)).await.unwrap_or(false)
    }
}
