//! Correspondence rows between AniDB and TVDB episode numbering.
//!
//! One `EpisodeMap` row is a window of episodes where the two schemes line
//! up linearly: `anidb_ep + offset = tvdb_ep` inside `[start, end]`. A row
//! with `tvdb_season == -1` carries the franchise-wide absolute ordering
//! instead of a real broadcast season.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel TVDB season used for absolute-order rows.
pub const ABSOLUTE_SEASON: i32 = -1;

/// One correspondence window between an AniDB entry and a TVDB season.
///
/// Built only by [`crate::mapping::builder::EpisodeMapBuilder`]; immutable
/// and read-only for the resolver. `start`/`end` are AniDB episode bounds
/// with 0 meaning unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeMap {
    pub anidb_id: i32,

    pub tvdb_id: i32,

    /// 0 = specials, 1 = regular run.
    pub anidb_season: i32,

    /// -1 = absolute-order sentinel, 0 = TVDB specials, >= 1 regular season.
    pub tvdb_season: i32,

    pub start: i32,

    pub end: i32,

    /// `anidb_ep + offset = tvdb_ep`.
    pub offset: i32,

    /// Special-episode index -> regular episode it precedes in airing order.
    #[serde(default)]
    pub before: BTreeMap<i32, i32>,

    /// AniDB episode -> TVDB episodes, for non-linear insertions.
    #[serde(default)]
    pub explicit: BTreeMap<i32, Vec<i32>>,
}

impl EpisodeMap {
    #[must_use]
    pub const fn is_absolute_order(&self) -> bool {
        self.tvdb_season == ABSOLUTE_SEASON
    }

    #[must_use]
    pub const fn to_tvdb_episode(&self, anidb_episode: i32) -> i32 {
        anidb_episode + self.offset
    }

    #[must_use]
    pub const fn to_anidb_episode(&self, tvdb_episode: i32) -> i32 {
        tvdb_episode - self.offset
    }

    /// True for rows pairing a real AniDB season with a real TVDB season
    /// (includes the TVDB specials bucket, excludes the absolute sentinel).
    #[must_use]
    pub const fn is_season_pair(&self) -> bool {
        self.anidb_season >= 0 && self.tvdb_season >= 0
    }

    /// AniDB-side bounds as a range value.
    #[must_use]
    pub const fn anidb_range(&self) -> crate::models::EpisodeRange {
        crate::models::EpisodeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Canonical ordering for loaded row sets. Grouping and the resolver's
/// merge-scan both assume exactly this order.
pub fn sort_rows(rows: &mut [EpisodeMap]) {
    rows.sort_by_key(|r| (r.anidb_id, r.tvdb_season, r.anidb_season, r.start));
}

/// Partitions a pre-sorted row set into contiguous per-`anidb_id` slices.
///
/// Slice order and row order inside each slice are exactly the input order,
/// so grouping is deterministic for a canonically sorted input.
#[must_use]
pub fn group_by_anidb_id(rows: &[EpisodeMap]) -> Vec<&[EpisodeMap]> {
    let mut groups = Vec::new();
    let mut from = 0;

    for i in 1..=rows.len() {
        if i == rows.len() || rows[i].anidb_id != rows[from].anidb_id {
            groups.push(&rows[from..i]);
            from = i;
        }
    }

    groups
}

/// First absolute-order row of a group, if the group has one.
#[must_use]
pub fn absolute_order_row(group: &[EpisodeMap]) -> Option<&EpisodeMap> {
    group.iter().find(|r| r.is_absolute_order())
}

/// True when one AniDB entry's regular episodes were split across multiple
/// TVDB seasons, so a TV episode range cannot be assumed contiguous in
/// AniDB terms.
#[must_use]
pub fn has_split_regular_seasons(group: &[EpisodeMap]) -> bool {
    group
        .iter()
        .filter(|r| r.anidb_season > 0 && r.tvdb_season > 0)
        .count()
        > 1
}

/// True when the candidate episode numbers can only be absolute: some
/// number exceeds every bounded per-season window in the group. Requires an
/// absolute-order row to exist, otherwise absolute numbering is not in play
/// for this group at all.
#[must_use]
pub fn looks_absolute(episodes: &[i32], group: &[EpisodeMap]) -> bool {
    if absolute_order_row(group).is_none() {
        return false;
    }

    let max_bound = group
        .iter()
        .filter(|r| !r.is_absolute_order() && r.end > 0)
        .map(|r| r.end)
        .max();

    max_bound.is_some_and(|bound| episodes.iter().any(|&e| e > bound))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(anidb_id: i32, anidb_season: i32, tvdb_season: i32, start: i32, end: i32) -> EpisodeMap {
        EpisodeMap {
            anidb_id,
            tvdb_id: 100,
            anidb_season,
            tvdb_season,
            start,
            end,
            ..Default::default()
        }
    }

    #[test]
    fn test_offset_round_trip() {
        let r = EpisodeMap {
            offset: -891,
            ..Default::default()
        };
        assert_eq!(r.to_tvdb_episode(1080), 189);
        assert_eq!(r.to_anidb_episode(r.to_tvdb_episode(1080)), 1080);
        assert_eq!(r.to_tvdb_episode(r.to_anidb_episode(42)), 42);
    }

    #[test]
    fn test_group_by_anidb_id_preserves_runs() {
        let rows = vec![
            row(10, 1, -1, 1, 24),
            row(10, 1, 1, 1, 12),
            row(10, 1, 2, 13, 24),
            row(11, 1, 0, 0, 0),
            row(12, 1, 3, 0, 0),
        ];

        let groups = group_by_anidb_id(&rows);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 1);
        assert_eq!(groups[2].len(), 1);
        assert!(groups[0].iter().all(|r| r.anidb_id == 10));
        assert_eq!(groups[1][0].anidb_id, 11);

        assert!(group_by_anidb_id(&[]).is_empty());
    }

    #[test]
    fn test_absolute_order_row() {
        let rows = vec![row(10, 1, -1, 1, 24), row(10, 1, 1, 1, 12)];
        assert!(absolute_order_row(&rows).is_some_and(EpisodeMap::is_absolute_order));

        let no_abs = vec![row(10, 1, 1, 1, 12)];
        assert!(absolute_order_row(&no_abs).is_none());
    }

    #[test]
    fn test_has_split_regular_seasons() {
        let split = vec![row(10, 1, 1, 1, 12), row(10, 1, 2, 13, 24)];
        assert!(has_split_regular_seasons(&split));

        let single = vec![row(10, 1, 1, 1, 12), row(10, 0, 0, 0, 0)];
        assert!(!has_split_regular_seasons(&single));

        // A specials row (tvdb season 0) does not count as a split.
        let with_specials = vec![row(10, 1, 1, 1, 12), row(10, 1, 0, 0, 0)];
        assert!(!has_split_regular_seasons(&with_specials));
    }

    #[test]
    fn test_looks_absolute() {
        let group = vec![
            row(10, 1, -1, 1, 24),
            row(10, 1, 1, 1, 12),
            row(10, 1, 2, 13, 24),
        ];
        assert!(looks_absolute(&[30], &group));
        assert!(!looks_absolute(&[7], &group));

        // Without an absolute-order row the test never applies.
        let no_abs = vec![row(10, 1, 1, 1, 12)];
        assert!(!looks_absolute(&[30], &no_abs));
    }

    #[test]
    fn test_sort_rows_canonical_order() {
        let mut rows = vec![
            row(11, 1, 1, 1, 12),
            row(10, 1, 2, 13, 24),
            row(10, 1, -1, 1, 24),
            row(10, 1, 1, 1, 12),
        ];
        sort_rows(&mut rows);

        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.anidb_id, r.tvdb_season))
            .collect();
        assert_eq!(keys, vec![(10, -1), (10, 1), (10, 2), (11, 1)]);
    }
}
