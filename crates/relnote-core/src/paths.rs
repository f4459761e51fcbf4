use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const RELNOTE_DIR: &str = ".relnote";
pub const CONFIG_FILE: &str = ".relnote/config.yaml";
pub const CANVASES_DIR: &str = ".relnote/canvases";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn relnote_dir(root: &Path) -> PathBuf {
    root.join(RELNOTE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Metadata directory: `configured` (relative to `root` unless absolute), or
/// the default `.relnote/canvases`.
pub fn metadata_dir(root: &Path, configured: Option<&str>) -> PathBuf {
    match configured.map(str::trim).filter(|d| !d.is_empty()) {
        Some(dir) => root.join(dir),
        None => root.join(CANVASES_DIR),
    }
}

/// Filesystem-safe file stem for a metadata key (`C123:web-app` becomes
/// `C123_web-app`).
pub fn key_file_stem(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
