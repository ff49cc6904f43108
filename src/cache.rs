//! Resume bookmark per transcript file.
//!
//! Files are stored under `.cache/` using a hash of the transcript path as the
//! directory name. The format is a tiny TOML file with the last playback time
//! and scroll offset. Errors are ignored; a lost bookmark only means starting
//! from the top.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CACHE_DIR: &str = ".cache";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub time_ms: u64,
    #[serde(default)]
    pub scroll_offset: f32,
}

pub fn load_bookmark(transcript: &Path) -> Option<Bookmark> {
    load_bookmark_in(Path::new(CACHE_DIR), transcript)
}

pub fn save_bookmark(transcript: &Path, bookmark: &Bookmark) {
    save_bookmark_in(Path::new(CACHE_DIR), transcript, bookmark);
}

fn load_bookmark_in(root: &Path, transcript: &Path) -> Option<Bookmark> {
    let data = fs::read_to_string(bookmark_path(root, transcript)).ok()?;
    toml::from_str(&data).ok()
}

fn save_bookmark_in(root: &Path, transcript: &Path, bookmark: &Bookmark) {
    let path = bookmark_path(root, transcript);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(contents) = toml::to_string(bookmark) {
        match fs::write(&path, contents) {
            Ok(()) => debug!(path = %path.display(), ?bookmark, "Saved bookmark"),
            Err(err) => debug!(path = %path.display(), "Failed to save bookmark: {err}"),
        }
    }
}

pub fn hash_dir(root: &Path, transcript: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(transcript.as_os_str().to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    root.join(hash)
}

fn bookmark_path(root: &Path, transcript: &Path) -> PathBuf {
    hash_dir(root, transcript).join("bookmark.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookmark_round_trips_per_transcript() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = Path::new("talks/first.vtt");
        let second = Path::new("talks/second.vtt");
        let bookmark = Bookmark {
            time_ms: 83_250,
            scroll_offset: 1_240.5,
        };
        save_bookmark_in(dir.path(), first, &bookmark);
        assert_eq!(load_bookmark_in(dir.path(), first), Some(bookmark));
        assert_eq!(load_bookmark_in(dir.path(), second), None);
    }

    #[test]
    fn unreadable_bookmark_is_ignored() {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = Path::new("broken.json");
        let path = bookmark_path(dir.path(), transcript);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "time_ms = \"soon\"").expect("write");
        assert_eq!(load_bookmark_in(dir.path(), transcript), None);
    }

    #[test]
    fn hash_dir_is_stable_and_path_specific() {
        let root = Path::new(CACHE_DIR);
        let a = hash_dir(root, Path::new("a.vtt"));
        assert_eq!(a, hash_dir(root, Path::new("a.vtt")));
        assert_ne!(a, hash_dir(root, Path::new("b.vtt")));
        assert!(a.starts_with(CACHE_DIR));
    }
}
