pub mod command_file;
pub mod encoder_file;
pub mod session_record;
pub mod status_file;

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::IpcError;

/// A JSON document in the tmpfs shared-memory directory, written by
/// exactly one component and read by any number of others under a
/// simple non-blocking advisory lock: single writer per file, multiple
/// readers permitted, contention is skipped rather than awaited.
pub struct IpcFile<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> IpcFile<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        IpcFile {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically publishes `value`: serialize into a sibling temp file
    /// then rename over `path`, so readers never observe a partially
    /// written document.
    pub async fn write_atomic(&self, value: &T) -> Result<(), IpcError> {
        let body = serde_json::to_vec_pretty(value).map_err(|e| IpcError::WriteFailed {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &body)
            .await
            .map_err(|e| IpcError::WriteFailed {
                path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| IpcError::WriteFailed {
                path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(())
    }

    /// Reads and parses the file if present. A missing file is reported
    /// as `Unreadable` (callers decide whether that's fatal — e.g. the
    /// encoder file being absent means the daemon hasn't published yet,
    /// which is not fatal to the motor service).
    pub async fn read(&self) -> Result<T, IpcError> {
        let body =
            tokio::fs::read(&self.path)
                .await
                .map_err(|e| IpcError::Unreadable {
                    path: self.path.display().to_string(),
                    detail: e.to_string(),
                })?;
        serde_json::from_slice(&body).map_err(|e| IpcError::Unreadable {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Non-blocking contention guard: if a sibling `.lock` marker exists
    /// the caller should skip this tick rather than wait for it.
    pub async fn try_lock(&self) -> Result<IpcLockGuard, IpcError> {
        let lock_path = self.path.with_extension("lock");
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(_) => Ok(IpcLockGuard { lock_path }),
            Err(_) => Err(IpcError::Locked {
                path: self.path.display().to_string(),
            }),
        }
    }
}

/// Dropping this removes the lock marker; held across a single
/// read-modify-write tick.
pub struct IpcLockGuard {
    lock_path: PathBuf,
}

impl Drop for IpcLockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: i32,
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::<Sample>::new(dir.path().join("sample.json"));
        file.write_atomic(&Sample { value: 7 }).await.unwrap();
        let read_back = file.read().await.unwrap();
        assert_eq!(read_back, Sample { value: 7 });
    }

    #[tokio::test]
    async fn read_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::<Sample>::new(dir.path().join("missing.json"));
        assert!(matches!(file.read().await, Err(IpcError::Unreadable { .. })));
    }

    #[tokio::test]
    async fn lock_guard_blocks_then_releases() {
        let dir = tempfile::tempdir().unwrap();
        let file = IpcFile::<Sample>::new(dir.path().join("sample.json"));
        let guard = file.try_lock().await.unwrap();
        assert!(file.try_lock().await.is_err());
        drop(guard);
        assert!(file.try_lock().await.is_ok());
    }
}
