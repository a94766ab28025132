//! Derives runtime artefact paths shared by the CLI and daemon.
//!
//! The runtime directory houses the daemon lock, pid, and health snapshot
//! files. Both binaries need to agree on the layout so lifecycle commands can
//! interact with the files written by the daemon supervisor. All artefacts
//! live next to the socket itself.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const LOCK_FILE_NAME: &str = "stashd.lock";
const PID_FILE_NAME: &str = "stashd.pid";
const HEALTH_FILE_NAME: &str = "stashd.health";

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    runtime_dir: PathBuf,
    lock_path: PathBuf,
    pid_path: PathBuf,
    health_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration, creating the
    /// runtime directory when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError`] when the socket has no parent directory
    /// or the directory cannot be created.
    pub fn from_config(config: &Config) -> Result<Self, RuntimePathsError> {
        let paths = Self::from_config_readonly(config)?;
        fs::create_dir_all(&paths.runtime_dir).map_err(|source| {
            RuntimePathsError::RuntimeDirectory {
                path: paths.runtime_dir.clone(),
                source,
            }
        })?;
        Ok(paths)
    }

    /// Derives runtime paths without touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimePathsError::MissingSocketParent`] when the socket has
    /// no parent directory.
    pub fn from_config_readonly(config: &Config) -> Result<Self, RuntimePathsError> {
        let runtime_dir = config
            .socket()
            .parent()
            .map(|parent| parent.as_std_path().to_path_buf())
            .ok_or_else(|| RuntimePathsError::MissingSocketParent {
                path: config.socket().to_string(),
            })?;
        Ok(Self {
            lock_path: runtime_dir.join(LOCK_FILE_NAME),
            pid_path: runtime_dir.join(PID_FILE_NAME),
            health_path: runtime_dir.join(HEALTH_FILE_NAME),
            runtime_dir,
        })
    }

    /// Directory holding runtime artefacts.
    #[must_use]
    pub fn runtime_dir(&self) -> &Path {
        self.runtime_dir.as_path()
    }

    /// Path to the lock file guarding singleton startup.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID file.
    #[must_use]
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the health snapshot.
    #[must_use]
    pub fn health_path(&self) -> &Path {
        self.health_path.as_path()
    }
}

/// Errors raised while deriving daemon runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The socket path lacked a parent directory.
    #[error("socket path '{path}' has no parent directory")]
    MissingSocketParent { path: String },
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{path}': {source}")]
    RuntimeDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
