use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

// Lock files are advisory and only guard writers that go through this module. A crashed writer
// leaves its lock behind, so locks older than this are broken.
const STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

pub fn lock_path_for(store_path: &Path) -> PathBuf {
    let mut s = OsString::from(store_path.as_os_str());
    s.push(".lock");
    PathBuf::from(s)
}

// `Ok(None)` means another writer currently holds the lock.
pub fn try_acquire_store_lock(store_path: &Path) -> std::io::Result<Option<StoreLock>> {
    let path = lock_path_for(store_path);

    match create_lock_file(&path) {
        Ok(()) => return Ok(Some(StoreLock { path })),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
        Err(err) => return Err(err),
    }

    if !is_stale(&path) {
        return Ok(None);
    }

    tracing::warn!(lock = %path.display(), "breaking stale store lock");
    match std::fs::remove_file(&path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    match create_lock_file(&path) {
        Ok(()) => Ok(Some(StoreLock { path })),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(err),
    }
}

fn create_lock_file(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= STALE_AFTER)
}
