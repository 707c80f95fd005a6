//! Durable state persistence for atomic file-based storage.
//!
//! Loop state lives in a single document at a fixed relative path under the
//! project root. Every write replaces the whole document via a temp-file
//! rename, so the persisted state is always one consistent snapshot. A
//! missing or unparsable document reads as "no state" rather than an error.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::engine::state::LoopState;
use crate::error::Result;

/// Directory created under the project root for loop state.
const STATE_DIR: &str = ".taskloop";

/// State document file name.
const STATE_FILE: &str = "loop.json";

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// Persists [`LoopState`] to a per-project location.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Directory where the state document is stored.
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given project directory.
    #[must_use]
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    /// Returns the path to the state document.
    #[must_use]
    pub fn state_file_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Returns the path to the temporary write file.
    #[must_use]
    pub fn tmp_file_path(&self) -> PathBuf {
        self.dir.join(format!("{STATE_FILE}{TMP_SUFFIX}"))
    }

    /// Saves loop state atomically, creating the directory on first write.
    pub fn save(&self, state: &LoopState) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.tmp_file_path();
        let json = serde_json::to_string_pretty(state)?;

        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;

        fs::rename(&tmp_path, self.state_file_path())?;

        Ok(())
    }

    /// Loads loop state from the document.
    ///
    /// A missing document and a corrupt document both resolve to `Ok(None)`:
    /// damaged state means "start fresh," not a crash.
    pub fn load(&self) -> Result<Option<LoopState>> {
        let state_path = self.state_file_path();

        let contents = match fs::read_to_string(&state_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(
                    "Corrupted state file at {}: {}. Treating as absent.",
                    state_path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Deletes the state document if it exists.
    pub fn delete(&self) -> Result<()> {
        let state_path = self.state_file_path();
        if state_path.exists() {
            fs::remove_file(&state_path)?;
        }
        Ok(())
    }

    /// Checks if a state document exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.state_file_path().exists()
    }
}
