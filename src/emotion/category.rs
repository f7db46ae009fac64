//! Playback categories and the detector-label mapper

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::config::LibraryConfig;
use crate::{Error, Result};

/// A music bucket a committed emotion maps to (e.g. "happy", "sad")
///
/// The set of categories is data-driven: it comes from configuration,
/// not from a fixed enum. Names are normalized to trimmed lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlaybackCategory(String);

impl PlaybackCategory {
    /// Create a category from a name
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    /// Category name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaybackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaybackCategory {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Maps raw detector labels to playback categories
///
/// Total over any input: labels nobody claimed fall back to the
/// configured fallback category.
#[derive(Debug, Clone)]
pub struct CategoryMapper {
    labels: HashMap<String, PlaybackCategory>,
    categories: Vec<PlaybackCategory>,
    fallback: PlaybackCategory,
}

impl CategoryMapper {
    /// Build a mapper from `(category, labels)` pairs
    ///
    /// # Errors
    ///
    /// Returns error if no categories are given, a category is listed twice,
    /// a label is claimed by two categories, or the fallback is not one of
    /// the categories
    pub fn new<I, L>(fallback: &str, mappings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (PlaybackCategory, L)>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let fallback = PlaybackCategory::new(fallback);
        let mut labels = HashMap::new();
        let mut categories: Vec<PlaybackCategory> = Vec::new();

        for (category, category_labels) in mappings {
            if category.as_str().is_empty() {
                return Err(Error::Config("category name must not be empty".to_string()));
            }
            if categories.contains(&category) {
                return Err(Error::Config(format!("category '{category}' configured twice")));
            }

            for label in category_labels {
                let label = label.as_ref().trim().to_lowercase();
                if let Some(existing) = labels.get(&label) {
                    return Err(Error::Config(format!(
                        "label '{label}' mapped to both '{existing}' and '{category}'"
                    )));
                }
                labels.insert(label, category.clone());
            }

            categories.push(category);
        }

        if categories.is_empty() {
            return Err(Error::Config("no playback categories configured".to_string()));
        }
        if !categories.contains(&fallback) {
            return Err(Error::Config(format!(
                "fallback category '{fallback}' is not a configured category"
            )));
        }

        Ok(Self {
            labels,
            categories,
            fallback,
        })
    }

    /// Build a mapper from the library configuration
    ///
    /// # Errors
    ///
    /// See [`CategoryMapper::new`]
    pub fn from_config(config: &LibraryConfig) -> Result<Self> {
        Self::new(
            &config.fallback,
            config
                .categories
                .iter()
                .map(|c| (PlaybackCategory::new(&c.name), c.labels.iter())),
        )
    }

    /// Map a raw detector label to its playback category
    #[must_use]
    pub fn map(&self, raw_label: &str) -> PlaybackCategory {
        let label = raw_label.trim().to_lowercase();
        self.labels.get(&label).map_or_else(
            || {
                tracing::trace!(label = raw_label, fallback = %self.fallback, "unmapped label");
                self.fallback.clone()
            },
            Clone::clone,
        )
    }

    /// Configured categories, in configuration order
    #[must_use]
    pub fn categories(&self) -> &[PlaybackCategory] {
        &self.categories
    }

    /// Category used for unknown labels
    #[must_use]
    pub const fn fallback(&self) -> &PlaybackCategory {
        &self.fallback
    }
}
