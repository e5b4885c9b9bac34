use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tempfile::NamedTempFile;
use tracing::warn;

use super::repository::{StorageBackend, StoreError};

/// How long a writer waits for another process to release the store lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// A lock file older than this is assumed to belong to a writer that crashed.
const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Writes `contents` to a temporary file beside `path`, syncs it, then renames it over
/// `path`. Readers observe either the previous file or the new one, never a partial write.
pub(crate) fn replace_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut staged = NamedTempFile::new_in(&dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| err.error)?;

    // Flush the directory entry where the platform allows opening directories.
    if let Ok(dir_handle) = fs::File::open(&dir) {
        if let Err(err) = dir_handle.sync_all() {
            warn!(dir = %dir.display(), error = %err, "directory sync after rename failed");
        }
    }

    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Exclusive write access to a store, released on drop.
#[derive(Debug)]
pub struct StorageLock {
    file: Option<LockFile>,
}

impl StorageLock {
    /// Lock for backends that are only reachable from the current process, where the
    /// repository's own mutex already serializes writers.
    pub fn in_process() -> Self {
        Self { file: None }
    }

    pub fn lock_path(&self) -> Option<&Path> {
        self.file.as_ref().map(|file| file.path.as_path())
    }
}

#[derive(Debug)]
struct LockFile {
    path: PathBuf,
    _handle: fs::File,
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to release applicant store lock");
        }
    }
}

/// CSV file on local disk.
///
/// Writers on the same path coordinate through a `<file>.lock` sibling created with
/// `create_new`, so separate processes (the server and a CLI run) never interleave
/// their load and save.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    lock_timeout: Duration,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("applicants"));
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

fn lock_is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::StorageRead { source }),
        }
    }

    fn write(&self, contents: &[u8]) -> Result<(), StoreError> {
        replace_atomically(&self.path, contents).map_err(|source| StoreError::StorageWrite { source })
    }

    fn lock(&self) -> Result<StorageLock, StoreError> {
        let lock_path = self.lock_path();
        fs::create_dir_all(parent_dir(&lock_path))
            .map_err(|source| StoreError::StorageWrite { source })?;

        let started = Instant::now();
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(handle) => {
                    return Ok(StorageLock {
                        file: Some(LockFile {
                            path: lock_path,
                            _handle: handle,
                        }),
                    })
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    if lock_is_stale(&lock_path) {
                        warn!(path = %lock_path.display(), "removing stale applicant store lock");
                        match fs::remove_file(&lock_path) {
                            Ok(()) => continue,
                            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                            Err(source) => return Err(StoreError::StorageWrite { source }),
                        }
                    }
                    if started.elapsed() >= self.lock_timeout {
                        return Err(StoreError::LockTimeout {
                            path: lock_path,
                            waited: self.lock_timeout,
                        });
                    }
                    thread::sleep(LOCK_RETRY_INTERVAL);
                }
                Err(source) => return Err(StoreError::StorageWrite { source }),
            }
        }
    }
}

/// In-process byte buffer.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    contents: Mutex<Option<Vec<u8>>>,
}

impl MemoryBackend {
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &[u8]) -> Result<(), StoreError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_vec());
        Ok(())
    }
}
