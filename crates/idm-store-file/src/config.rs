//! File store configuration.

use std::path::PathBuf;

use idm_store::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// File name of the users collection.
pub const USERS_FILE: &str = "idm-users.db";
/// File name of the roles collection.
pub const ROLES_FILE: &str = "idm-roles.db";
/// File name of the groups collection.
pub const GROUPS_FILE: &str = "idm-groups.db";
/// File name of the memberships collection.
pub const MEMBERSHIPS_FILE: &str = "idm-memberships.db";

/// File store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Directory holding the four collection files.
    pub working_dir: PathBuf,
    /// Recreate empty files on open instead of loading existing state.
    pub always_create_files: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            working_dir: std::env::temp_dir(),
            always_create_files: true,
        }
    }
}

impl FileStoreConfig {
    /// Creates a configuration for the given working directory.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    /// Sets whether files are recreated on open.
    #[must_use]
    pub const fn always_create_files(mut self, recreate: bool) -> Self {
        self.always_create_files = recreate;
        self
    }

    /// Path of the users file.
    #[must_use]
    pub fn users_path(&self) -> PathBuf {
        self.working_dir.join(USERS_FILE)
    }

    /// Path of the roles file.
    #[must_use]
    pub fn roles_path(&self) -> PathBuf {
        self.working_dir.join(ROLES_FILE)
    }

    /// Path of the groups file.
    #[must_use]
    pub fn groups_path(&self) -> PathBuf {
        self.working_dir.join(GROUPS_FILE)
    }

    /// Path of the memberships file.
    #[must_use]
    pub fn memberships_path(&self) -> PathBuf {
        self.working_dir.join(MEMBERSHIPS_FILE)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the working directory exists but is not a
    /// directory.
    pub fn validate(&self) -> StorageResult<()> {
        if self.working_dir.as_os_str().is_empty() {
            return Err(StorageError::InvalidData(
                "working directory is required".to_string(),
            ));
        }
        if self.working_dir.exists() && !self.working_dir.is_dir() {
            return Err(StorageError::InvalidData(format!(
                "working directory {} is not a directory",
                self.working_dir.display()
            )));
        }
        Ok(())
    }
}
