//! File-backed session store.
//!
//! Token and user are written as a single JSON document, so a reader can
//! never observe one without the other. Writes go to a staging file in the
//! same directory and are renamed over the live file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::StoredSession;
use crate::domain::ports::{SessionStore, SessionStoreError};

/// Session store persisting to one file inside a capability-scoped directory.
#[derive(Debug)]
pub struct FileSessionStore {
    dir: Dir,
    dir_path: PathBuf,
    file_name: PathBuf,
    staging_name: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Open (creating if needed) `directory` and store sessions in
    /// `file_name` beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Io`] when the directory cannot be
    /// created or opened.
    pub fn open(directory: &Path, file_name: &str) -> Result<Self, SessionStoreError> {
        Dir::create_ambient_dir_all(directory, ambient_authority())
            .map_err(|error| io_error(directory, &error))?;
        let dir = Dir::open_ambient_dir(directory, ambient_authority())
            .map_err(|error| io_error(directory, &error))?;
        Ok(Self {
            dir,
            dir_path: directory.to_path_buf(),
            file_name: PathBuf::from(file_name),
            staging_name: PathBuf::from(format!(".{file_name}.tmp")),
            write_lock: Mutex::new(()),
        })
    }

    /// Absolute location of the session file.
    pub fn path(&self) -> PathBuf {
        self.dir_path.join(&self.file_name)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<StoredSession>, SessionStoreError> {
        let bytes = match self.dir.read(&self.file_name) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&self.path(), &error)),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|error| {
            SessionStoreError::corrupt(format!("{}: {error}", self.path().display()))
        })
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        let body = serde_json::to_vec(session)
            .map_err(|error| SessionStoreError::io(format!("failed to encode session: {error}")))?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.dir
            .write(&self.staging_name, &body)
            .map_err(|error| io_error(&self.dir_path.join(&self.staging_name), &error))?;
        if let Err(error) = self.dir.rename(&self.staging_name, &self.dir, &self.file_name) {
            let _cleanup_result = self.dir.remove_file(&self.staging_name);
            return Err(io_error(&self.path(), &error));
        }
        debug!(path = %self.path().display(), "session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.dir.remove_file(&self.file_name) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&self.path(), &error)),
        }
    }
}

fn io_error(path: &Path, error: &io::Error) -> SessionStoreError {
    SessionStoreError::io(format!("{}: {error}", path.display()))
}
