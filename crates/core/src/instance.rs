//! Instance folder naming and on-disk layout.
//!
//! An instance is identified externally by its folder name under the
//! instance manager's data directory. The same name is handed to the
//! restart command, so it is validated before it is used for either.

use std::path::{Path, PathBuf};

/// Default base directory holding one sub-folder per instance.
pub const DEFAULT_INSTANCES_DIR: &str = "/home/amp/.ampdata/instances";

/// Config file inside each instance folder that carries the level URL.
pub const CONFIG_FILE_NAME: &str = "RustModule.kvp";

/// Upper bound on folder name length.
const MAX_FOLDER_NAME_LEN: usize = 128;

/// Allowed folder characters: alphanumeric, hyphen, underscore, dot.
///
/// `.` and `..` are rejected so a folder can never escape the base
/// directory.
pub fn is_safe_folder_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FOLDER_NAME_LEN
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Path of the config file for `folder`: `<base>/<folder>/RustModule.kvp`.
pub fn config_path(base_dir: &Path, folder: &str) -> PathBuf {
    base_dir.join(folder).join(CONFIG_FILE_NAME)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
