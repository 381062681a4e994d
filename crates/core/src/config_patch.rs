//! On-disk patcher for the instance `RustModule.kvp` file.
//!
//! [`ConfigPatcher::patch`] reads the file, splices the new level URL into
//! the `Rust.LevelUrl=` line, writes the whole file back and re-reads it to
//! confirm the new line landed. No backup is kept: a failure after the write
//! leaves whatever the write produced.

use std::path::{Path, PathBuf};

use crate::instance::{self, DEFAULT_INSTANCES_DIR};
use crate::kvp;

/// Error type for config patch operations.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("invalid instance folder name: {0:?}")]
    InvalidFolder(String),

    #[error("level URL must be a single line: {0:?}")]
    InvalidLevelUrl(String),

    #[error("config file missing or unreadable at {}: {source}", .path.display())]
    FileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no `Rust.LevelUrl=` line in {}", .path.display())]
    KeyNotFound { path: PathBuf },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("verification failed: {} does not contain `{expected}` after write", .path.display())]
    VerifyFailed { path: PathBuf, expected: String },
}

/// Outcome of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// File that was patched.
    pub path: PathBuf,
    /// Level URL the file carried before the patch.
    pub previous: String,
    /// `false` when the file already carried the requested URL and the
    /// write was skipped.
    pub changed: bool,
}

/// Rewrites the level URL line of instance config files under `base_dir`.
#[derive(Debug, Clone)]
pub struct ConfigPatcher {
    base_dir: PathBuf,
}

impl Default for ConfigPatcher {
    fn default() -> Self {
        Self::new(DEFAULT_INSTANCES_DIR)
    }
}

impl ConfigPatcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Config file path for `folder`.
    pub fn config_path(&self, folder: &str) -> PathBuf {
        instance::config_path(&self.base_dir, folder)
    }

    /// Set `Rust.LevelUrl` in `folder`'s config file to `level_url`.
    ///
    /// A file without the key is left untouched and reported as
    /// [`PatchError::KeyNotFound`]; the line is never inserted.
    pub async fn patch(&self, folder: &str, level_url: &str) -> Result<PatchReport, PatchError> {
        if !instance::is_safe_folder_name(folder) {
            return Err(PatchError::InvalidFolder(folder.to_string()));
        }
        if !kvp::is_valid_level_url(level_url) {
            return Err(PatchError::InvalidLevelUrl(level_url.to_string()));
        }

        let path = self.config_path(folder);
        let current = read_config(&path).await?;

        let substitution = match kvp::replace_level_url(&current, level_url) {
            Some(sub) => sub,
            None => return Err(PatchError::KeyNotFound { path }),
        };

        tracing::info!(
            path = %path.display(),
            previous = %substitution.previous,
            level_url,
            "Patching level URL",
        );

        let changed = substitution.text != current;
        if changed {
            tokio::fs::write(&path, substitution.text.as_bytes())
                .await
                .map_err(|source| PatchError::Write {
                    path: path.clone(),
                    source,
                })?;
        } else {
            tracing::debug!(path = %path.display(), "Level URL already current, write skipped");
        }

        verify_level_url(&path, level_url).await?;

        Ok(PatchReport {
            path,
            previous: substitution.previous,
            changed,
        })
    }
}

/// Re-read `path` and require the `Rust.LevelUrl=<level_url>` line.
async fn verify_level_url(path: &Path, level_url: &str) -> Result<(), PatchError> {
    let expected = kvp::level_url_line(level_url);
    let written = read_config(path).await?;
    if !written.contains(&expected) {
        tracing::error!(
            path = %path.display(),
            content = %written,
            "Level URL missing after write",
        );
        return Err(PatchError::VerifyFailed {
            path: path.to_path_buf(),
            expected,
        });
    }
    Ok(())
}

async fn read_config(path: &Path) -> Result<String, PatchError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PatchError::FileMissing {
            path: path.to_path_buf(),
            source,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
