//! Track library
//!
//! One directory per playback category, enumerated once at startup.

mod selector;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::LibraryConfig;
use crate::emotion::PlaybackCategory;

pub use selector::{PlaylistSelector, select};

/// Tracks available per playback category
///
/// Categories with no tracks are kept with an empty list.
#[derive(Debug, Clone, Default)]
pub struct PlaylistPool {
    tracks: BTreeMap<PlaybackCategory, Vec<PathBuf>>,
}

impl PlaylistPool {
    /// Build a pool from explicit track lists
    #[must_use]
    pub fn from_tracks<I>(tracks: I) -> Self
    where
        I: IntoIterator<Item = (PlaybackCategory, Vec<PathBuf>)>,
    {
        Self {
            tracks: tracks.into_iter().collect(),
        }
    }

    /// Scan every configured category directory
    ///
    /// Missing or unreadable directories yield an empty category.
    #[must_use]
    pub fn scan(config: &LibraryConfig) -> Self {
        let mut tracks = BTreeMap::new();

        for category in &config.categories {
            let dir = category.dir_in(&config.root);
            let found = scan_dir(&dir, &config.extensions);

            // The controller warns once if the category is ever committed
            if found.is_empty() {
                tracing::info!(
                    category = %category.name,
                    path = %dir.display(),
                    "no tracks found for category"
                );
            } else {
                tracing::debug!(
                    category = %category.name,
                    path = %dir.display(),
                    count = found.len(),
                    "tracks loaded"
                );
            }

            tracks.insert(PlaybackCategory::new(&category.name), found);
        }

        let pool = Self { tracks };
        tracing::info!(total = pool.total(), "track library loaded");
        pool
    }

    /// Tracks for a category; empty for unknown categories
    #[must_use]
    pub fn tracks(&self, category: &PlaybackCategory) -> &[PathBuf] {
        self.tracks.get(category).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterate categories and their tracks
    pub fn iter(&self) -> impl Iterator<Item = (&PlaybackCategory, &[PathBuf])> {
        self.tracks.iter().map(|(c, t)| (c, t.as_slice()))
    }

    /// Total number of tracks across all categories
    #[must_use]
    pub fn total(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }
}

/// List audio files directly inside `dir`, sorted by path
fn scan_dir(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %dir.display(), error = %e, "cannot read track directory");
            return Vec::new();
        }
    };

    let mut found: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_audio_extension(path, extensions))
        .collect();
    found.sort();
    found
}

fn has_audio_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}
