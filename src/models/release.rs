use serde::{Deserialize, Serialize};

/// Output of the external torrent-title parser, consumed read-only.
///
/// `title` is the cleaned series title; `torrent_title` is the raw release
/// name as published by the indexer. Zero in `year`/`year_end` means the
/// parser found no year.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedRelease {
    pub title: String,

    pub torrent_title: String,

    pub seasons: Vec<i32>,

    pub episodes: Vec<i32>,

    pub year: i32,

    pub year_end: i32,

    pub category: String,

    pub release_types: Vec<String>,
}

impl ParsedRelease {
    /// Min/max of the parsed episode numbers, if any were found.
    #[must_use]
    pub fn episode_span(&self) -> Option<(i32, i32)> {
        let min = self.episodes.iter().copied().min()?;
        let max = self.episodes.iter().copied().max()?;
        Some((min, max))
    }

    /// Width of the release's year range (batches spanning years), 0 when
    /// either end is unknown.
    #[must_use]
    pub fn year_span(&self) -> i32 {
        if self.year > 0 && self.year_end > self.year {
            self.year_end - self.year
        } else {
            0
        }
    }

    #[must_use]
    pub fn has_seasons(&self) -> bool {
        !self.seasons.is_empty()
    }

    #[must_use]
    pub fn has_episodes(&self) -> bool {
        !self.episodes.is_empty()
    }
}
