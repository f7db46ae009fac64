//! Random track selection

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::PlaylistPool;
use crate::emotion::PlaybackCategory;

/// Pick a track for `category` uniformly at random
///
/// The track in `recently_played` is avoided when the category has any
/// other track. Returns `None` for an empty category.
pub fn select<'a, R: Rng + ?Sized>(
    category: &PlaybackCategory,
    pool: &'a PlaylistPool,
    recently_played: Option<&Path>,
    rng: &mut R,
) -> Option<&'a Path> {
    let tracks = pool.tracks(category);

    if tracks.len() > 1
        && let Some(recent) = recently_played
    {
        let fresh: Vec<&'a Path> = tracks
            .iter()
            .map(std::path::PathBuf::as_path)
            .filter(|t| *t != recent)
            .collect();
        if let Some(track) = fresh.choose(rng) {
            return Some(*track);
        }
    }

    tracks.choose(rng).map(std::path::PathBuf::as_path)
}

/// Owns the random source used for selection
#[derive(Debug)]
pub struct PlaylistSelector {
    rng: StdRng,
}

impl Default for PlaylistSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistSelector {
    /// Selector seeded from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Selector with a fixed seed, for reproducible runs
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// See [`select`]
    pub fn select<'a>(
        &mut self,
        category: &PlaybackCategory,
        pool: &'a PlaylistPool,
        recently_played: Option<&Path>,
    ) -> Option<&'a Path> {
        select(category, pool, recently_played, &mut self.rng)
    }
}
