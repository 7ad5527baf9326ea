use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::AppError;
use crate::models::session::PersistedSession;

pub const NAVIGATION_STATE_KEY: &str = "driver_navigation_state";

/// Durable store for the single session record. Write-only from the
/// lifecycle machine's perspective except during startup restore.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<PersistedSession, AppError>;
    fn save(&self, record: &PersistedSession) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|err| AppError::Persistence(format!("create {}: {err}", dir.display())))?;

        Ok(Self {
            path: dir.join(format!("{NAVIGATION_STATE_KEY}.json")),
        })
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<PersistedSession, AppError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(PersistedSession::default());
            }
            Err(err) => {
                return Err(AppError::Persistence(format!(
                    "read {}: {err}",
                    self.path.display()
                )));
            }
        };

        serde_json::from_slice(&raw).map_err(|err| {
            AppError::Persistence(format!("decode {}: {err}", self.path.display()))
        })
    }

    fn save(&self, record: &PersistedSession) -> Result<(), AppError> {
        let payload = serde_json::to_vec(record)
            .map_err(|err| AppError::Persistence(format!("encode session record: {err}")))?;

        // Write-then-rename so a crash mid-write never leaves a truncated
        // record behind.
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)
            .map_err(|err| AppError::Persistence(format!("create {}: {err}", tmp.display())))?;
        file.write_all(&payload)
            .map_err(|err| AppError::Persistence(format!("write {}: {err}", tmp.display())))?;
        file.sync_all()
            .map_err(|err| AppError::Persistence(format!("sync {}: {err}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            AppError::Persistence(format!("rename into {}: {err}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "navigation state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "navigation state cleared");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::Persistence(format!(
                "remove {}: {err}",
                self.path.display()
            ))),
        }
    }
}

/// Ephemeral store; keeps the record in memory only. Used where restart
/// durability is not wanted, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<PersistedSession>>,
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<PersistedSession, AppError> {
        let record = self
            .record
            .lock()
            .map_err(|_| AppError::Persistence("session record lock poisoned".to_string()))?;
        Ok(record.clone().unwrap_or_default())
    }

    fn save(&self, record: &PersistedSession) -> Result<(), AppError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|_| AppError::Persistence("session record lock poisoned".to_string()))?;
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|_| AppError::Persistence("session record lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}
