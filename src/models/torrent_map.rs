use serde::{Deserialize, Serialize};

/// Inclusive episode range; 0 on either side means "unbounded".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRange {
    pub start: i32,
    pub end: i32,
}

impl EpisodeRange {
    #[must_use]
    pub const fn bounded(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn unbounded() -> Self {
        Self { start: 0, end: 0 }
    }

    /// True when neither bound is set, e.g. a whole-entry OVA mapping.
    /// Persistence callers use this to tell "all episodes" from a range.
    #[must_use]
    pub const fn is_unbounded(self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// True when both bounds are set and inverted; such a range matches
    /// nothing and must never be emitted.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start > 0 && self.end > 0 && self.start > self.end
    }

    /// Shifts the set bounds by `delta`, leaving unbounded sides alone.
    #[must_use]
    pub const fn shift(self, delta: i32) -> Self {
        Self {
            start: if self.start > 0 { self.start + delta } else { 0 },
            end: if self.end > 0 { self.end + delta } else { 0 },
        }
    }

    /// Intersection, treating an unset bound as infinitely wide.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let start = match (self.start, other.start) {
            (0, s) | (s, 0) => s,
            (a, b) => a.max(b),
        };
        let end = match (self.end, other.end) {
            (0, e) | (e, 0) => e,
            (a, b) => a.min(b),
        };
        Self { start, end }
    }
}

/// Episodes of an `Anime` mapping: usually a contiguous range, but
/// non-linear explicit maps yield a discrete list instead. The sum type
/// keeps "both at once" unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnimeEpisodes {
    Range(EpisodeRange),
    List(Vec<i32>),
}

/// Which numbering scheme a resolved mapping is expressed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeasonMapping {
    /// Franchise-wide continuous numbering.
    Absolute(EpisodeRange),

    /// TVDB broadcast-season numbering; season 0 is the specials bucket.
    Tv { season: i32, range: EpisodeRange },

    /// The AniDB entry's own numbering (every entry restarts at 1).
    Anime { season: i32, episodes: AnimeEpisodes },
}

/// Short tag persisted with association rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SeasonType {
    #[serde(rename = "abs")]
    Absolute,
    #[serde(rename = "tv")]
    Tv,
    #[serde(rename = "ani")]
    Anime,
}

/// One resolved mapping for a release. Recomputed fresh on every resolution;
/// never persisted directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TorrentMap {
    pub anidb_id: i32,

    pub mapping: SeasonMapping,
}

impl TorrentMap {
    #[must_use]
    pub const fn season_type(&self) -> SeasonType {
        match self.mapping {
            SeasonMapping::Absolute(_) => SeasonType::Absolute,
            SeasonMapping::Tv { .. } => SeasonType::Tv,
            SeasonMapping::Anime { .. } => SeasonType::Anime,
        }
    }

    /// Converts to the persistence row for one torrent hash.
    #[must_use]
    pub fn into_association(self, hash: &str) -> AssociationRow {
        let season_type = self.season_type();
        let (season, range, episodes) = match self.mapping {
            SeasonMapping::Absolute(range) => (0, range, Vec::new()),
            SeasonMapping::Tv { season, range } => (season, range, Vec::new()),
            SeasonMapping::Anime { season, episodes } => match episodes {
                AnimeEpisodes::Range(range) => (season, range, Vec::new()),
                AnimeEpisodes::List(list) => (season, EpisodeRange::unbounded(), list),
            },
        };

        AssociationRow {
            anidb_id: self.anidb_id,
            hash: hash.to_string(),
            season_type,
            season,
            episode_start: range.start,
            episode_end: range.end,
            episodes,
        }
    }
}

/// Flattened row handed back to the caller for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssociationRow {
    pub anidb_id: i32,

    pub hash: String,

    pub season_type: SeasonType,

    pub season: i32,

    pub episode_start: i32,

    pub episode_end: i32,

    pub episodes: Vec<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_intersect() {
        let a = EpisodeRange::bounded(1, 10);
        let b = EpisodeRange::bounded(5, 20);
        assert_eq!(a.intersect(b), EpisodeRange::bounded(5, 10));

        let open = EpisodeRange::unbounded();
        assert_eq!(a.intersect(open), a);
        assert_eq!(open.intersect(b), b);
    }

    #[test]
    fn test_range_shift_skips_unset_bounds() {
        assert_eq!(
            EpisodeRange::bounded(3, 7).shift(10),
            EpisodeRange::bounded(13, 17)
        );
        assert_eq!(EpisodeRange::unbounded().shift(10), EpisodeRange::unbounded());
    }

    #[test]
    fn test_empty_range() {
        assert!(EpisodeRange::bounded(5, 3).is_empty());
        assert!(!EpisodeRange::bounded(3, 5).is_empty());
        assert!(!EpisodeRange::unbounded().is_empty());
    }

    #[test]
    fn test_association_wire_tags() {
        let map = TorrentMap {
            anidb_id: 69,
            mapping: SeasonMapping::Absolute(EpisodeRange::bounded(1080, 1090)),
        };
        let row = map.into_association("deadbeef");
        assert_eq!(row.season_type, SeasonType::Absolute);
        assert_eq!(row.season, 0);
        assert_eq!(row.episode_start, 1080);
        assert_eq!(row.episode_end, 1090);
    }
}
