//! Canonical on-disk layout under the eventsonar home.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! | Location | Store | Contents |
//! |----------|-------|----------|
//! | `events.json` | Freshness | Event list snapshot |
//! | `details/<id>.txt` | Detail | Extracted text |
//! | `voice/<id>.wav` | Voice | Synthesized audio |
//! | `journal/<id>.jsonl` | Journal | Stage events |
//!
//! Each store directory keeps its advisory lock files in `.locks/`.

use std::path::{Path, PathBuf};

/// File extension of the snapshot under the home directory
pub const SNAPSHOT_EXTENSION: &str = "json";
pub const DETAIL_EXTENSION: &str = "txt";
pub const VOICE_EXTENSION: &str = "wav";

/// Directory holding the snapshot file itself
pub fn snapshot_dir(home: &Path) -> PathBuf {
    home.to_path_buf()
}

/// The snapshot file (`<home>/events.json`)
pub fn snapshot_file(home: &Path) -> PathBuf {
    home.join(format!(
        "{}.{}",
        crate::store::freshness::SNAPSHOT_KEY,
        SNAPSHOT_EXTENSION
    ))
}

pub fn details_dir(home: &Path) -> PathBuf {
    home.join("details")
}

pub fn voice_dir(home: &Path) -> PathBuf {
    home.join("voice")
}

pub fn journal_dir(home: &Path) -> PathBuf {
    home.join("journal")
}
