//! Resolves a parsed release against loaded correspondence rows into
//! numbering-scheme-tagged episode ranges.
//!
//! A release names its episodes in one of three schemes (TVDB season
//! numbers, the AniDB entry's own numbering, or franchise-wide absolute
//! numbers) and rarely says which. Resolution picks the interpretations the
//! loaded rows support and emits one [`TorrentMap`] per scheme the caller
//! can index under. An empty result is a normal "no mapping" outcome.

use std::collections::{HashMap, HashSet};

use crate::config::MatchConfig;
use crate::models::{
    AniDbTitle, AnimeEpisodes, EpisodeRange, ParsedRelease, SeasonMapping, TorrentMap,
};

use super::episode_map::{
    EpisodeMap, absolute_order_row, group_by_anidb_id, has_split_regular_seasons, looks_absolute,
    sort_rows,
};

/// Resolves one release. `candidates` must already be ranked (best first)
/// and fuzzy-gated by [`super::title_match::TitleMatcher`]; `rows` are the
/// correspondence rows loaded for the candidates, in any order.
#[must_use]
pub fn resolve(
    release: &ParsedRelease,
    candidates: &[AniDbTitle],
    rows: &[EpisodeMap],
    config: &MatchConfig,
) -> Vec<TorrentMap> {
    if candidates.is_empty() || rows.is_empty() {
        return Vec::new();
    }

    let mut sorted = rows.to_vec();
    sort_rows(&mut sorted);
    let groups = group_by_anidb_id(&sorted);
    let group_index: HashMap<i32, usize> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g[0].anidb_id, i))
        .collect();
    let ordinals = season_ordinals(&groups);

    // First candidate per anidb id, with implausible years gated out.
    let mut seen_ids = HashSet::new();
    let candidates: Vec<&AniDbTitle> = candidates
        .iter()
        .filter(|c| seen_ids.insert(c.anidb_id))
        .filter(|c| year_plausible(release, c.year, config.year_window))
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    if release.has_seasons() {
        resolve_with_seasons(release, &candidates, &groups, &group_index, &ordinals)
    } else if release.has_episodes() {
        resolve_episodes_only(release, &candidates, &groups, &group_index)
    } else {
        resolve_without_numbers(release, &candidates, &groups, &group_index)
    }
}

/// Plausibility window: the configured tolerance widened by the release's
/// own year span (batches spanning years).
fn year_plausible(release: &ParsedRelease, candidate_year: i32, window: i32) -> bool {
    if release.year == 0 || candidate_year == 0 {
        return true;
    }
    (candidate_year - release.year).abs() <= window + release.year_span()
}

/// 1-based position of each AniDB entry among the entries sharing its TVDB
/// id, ordered by first regular TVDB season. This is the entry's season
/// number in the franchise's own counting.
fn season_ordinals(groups: &[&[EpisodeMap]]) -> HashMap<(i32, i32), i32> {
    let mut per_tvdb: HashMap<i32, Vec<(i32, i32)>> = HashMap::new();
    for group in groups {
        let min_season = group
            .iter()
            .filter(|r| r.tvdb_season > 0)
            .map(|r| r.tvdb_season)
            .min();
        if let Some(season) = min_season {
            per_tvdb
                .entry(group[0].tvdb_id)
                .or_default()
                .push((season, group[0].anidb_id));
        }
    }

    let mut ordinals = HashMap::new();
    for (tvdb_id, mut entries) in per_tvdb {
        entries.sort_unstable();
        for (position, (_, anidb_id)) in entries.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            ordinals.insert((tvdb_id, *anidb_id), position as i32 + 1);
        }
    }
    ordinals
}

/// Movie/special releases: no season, no episode numbers. Only the single
/// best-matching title is considered, and a known year mismatch rejects it.
fn resolve_without_numbers(
    release: &ParsedRelease,
    candidates: &[&AniDbTitle],
    groups: &[&[EpisodeMap]],
    group_index: &HashMap<i32, usize>,
) -> Vec<TorrentMap> {
    let best = candidates[0];
    if best.year > 0 && release.year > 0 && best.year != release.year {
        return Vec::new();
    }

    let Some(&g) = group_index.get(&best.anidb_id) else {
        return Vec::new();
    };
    let group = groups[g];

    // One anidb id can map to several TVDB ids; treat each pairing on its own.
    let mut tvdb_ids: Vec<i32> = group.iter().map(|r| r.tvdb_id).collect();
    tvdb_ids.sort_unstable();
    tvdb_ids.dedup();

    let mut out = Vec::new();
    let mut anime_seen = HashSet::new();
    let mut absolute_seen = HashSet::new();

    for tvdb_id in tvdb_ids {
        let abs = group
            .iter()
            .find(|r| r.tvdb_id == tvdb_id && r.is_absolute_order());

        if let Some(abs) = abs {
            if absolute_seen.insert(abs.anidb_id) {
                push_if_valid(
                    &mut out,
                    abs.anidb_id,
                    SeasonMapping::Absolute(abs.anidb_range().shift(abs.offset)),
                );
            }
            if anime_seen.insert(abs.anidb_id) {
                push_if_valid(
                    &mut out,
                    abs.anidb_id,
                    SeasonMapping::Anime {
                        season: 1,
                        episodes: AnimeEpisodes::Range(abs.anidb_range()),
                    },
                );
            }
        }

        for row in group {
            if row.tvdb_id != tvdb_id || !row.is_season_pair() {
                continue;
            }

            if anime_seen.insert(row.anidb_id) {
                let episodes = if row.explicit.is_empty() {
                    AnimeEpisodes::Range(row.anidb_range())
                } else {
                    AnimeEpisodes::List(row.explicit.keys().copied().collect())
                };
                push_if_valid(
                    &mut out,
                    row.anidb_id,
                    SeasonMapping::Anime {
                        season: row.anidb_season.max(1),
                        episodes,
                    },
                );
            }
            push_if_valid(
                &mut out,
                row.anidb_id,
                SeasonMapping::Tv {
                    season: row.tvdb_season,
                    range: row.anidb_range().shift(row.offset),
                },
            );
        }
    }

    out
}

/// Season-tagged releases.
fn resolve_with_seasons(
    release: &ParsedRelease,
    candidates: &[&AniDbTitle],
    groups: &[&[EpisodeMap]],
    group_index: &HashMap<i32, usize>,
    ordinals: &HashMap<(i32, i32), i32>,
) -> Vec<TorrentMap> {
    let requested = release
        .episode_span()
        .map(|(start, end)| EpisodeRange::bounded(start, end));
    // With exactly one season and at most one episode the release is
    // unambiguous: the first interpretation that fits wins and no second
    // reading is attempted.
    let singular = release.seasons.len() == 1 && release.episodes.len() <= 1;

    let mut out = Vec::new();
    let mut scheme_seen = HashSet::new();

    'candidates: for candidate in candidates {
        let Some(&g) = group_index.get(&candidate.anidb_id) else {
            continue;
        };
        let group = groups[g];
        let abs = absolute_order_row(group);
        let looks_abs = looks_absolute(&release.episodes, group);
        let split = has_split_regular_seasons(group);

        for row in group {
            if !row.is_season_pair() {
                continue;
            }

            let ordinal = ordinals.get(&(row.tvdb_id, row.anidb_id)).copied();
            let tv_match = release.seasons.contains(&row.tvdb_season);
            let anime_match = row.anidb_season == 1
                && ordinal.is_some_and(|o| o != row.tvdb_season && release.seasons.contains(&o));

            let mut interpretations = Vec::new();
            if tv_match {
                interpretations.push((true, row.tvdb_season));
            }
            if anime_match && !(singular && tv_match) {
                interpretations.push((false, ordinal.unwrap_or(row.tvdb_season)));
            }

            for (is_tv, matched_season) in interpretations {
                // Express the requested episodes in the entry's own numbering.
                let anime_range = match requested {
                    Some(req) if looks_abs => {
                        abs.map_or(req, |abs_row| req.shift(-abs_row.offset))
                    }
                    Some(req) if is_tv => req.shift(-row.offset),
                    Some(req) => req,
                    None => row.anidb_range(),
                };
                let anime_range = anime_range.intersect(row.anidb_range());
                if anime_range.is_empty() {
                    continue;
                }

                if scheme_seen.insert(row.anidb_id) {
                    if let Some(abs_row) = abs {
                        let clipped = anime_range.intersect(abs_row.anidb_range());
                        push_if_valid(
                            &mut out,
                            row.anidb_id,
                            SeasonMapping::Absolute(clipped.shift(abs_row.offset)),
                        );
                        push_if_valid(
                            &mut out,
                            row.anidb_id,
                            SeasonMapping::Anime {
                                season: matched_season,
                                episodes: AnimeEpisodes::Range(clipped),
                            },
                        );
                    } else if !split {
                        push_if_valid(
                            &mut out,
                            row.anidb_id,
                            SeasonMapping::Anime {
                                season: matched_season,
                                episodes: AnimeEpisodes::Range(anime_range),
                            },
                        );
                    }
                }

                let tv_range = match requested {
                    Some(req) if is_tv && !looks_abs => req,
                    _ => anime_range.shift(row.offset),
                };
                push_if_valid(
                    &mut out,
                    row.anidb_id,
                    SeasonMapping::Tv {
                        season: row.tvdb_season,
                        range: tv_range,
                    },
                );

                if singular {
                    break 'candidates;
                }
            }
        }
    }

    out
}

/// Episode numbers without a season: a merge-scan over sorted,
/// non-overlapping season windows, carrying the unconsumed remainder of the
/// requested range forward into the next window.
fn resolve_episodes_only(
    release: &ParsedRelease,
    candidates: &[&AniDbTitle],
    groups: &[&[EpisodeMap]],
    group_index: &HashMap<i32, usize>,
) -> Vec<TorrentMap> {
    let Some((start, end)) = release.episode_span() else {
        return Vec::new();
    };
    let requested = EpisodeRange::bounded(start, end);

    // Prefer a candidate carrying absolute ordering: bare episode numbers
    // on such franchises are absolute by convention.
    let abs_candidate = candidates.iter().find_map(|c| {
        let &g = group_index.get(&c.anidb_id)?;
        absolute_order_row(groups[g]).map(|abs| (groups[g], abs))
    });

    let mut out = Vec::new();

    if let Some((group, abs)) = abs_candidate {
        let anime_range = requested.shift(-abs.offset).intersect(abs.anidb_range());
        if anime_range.is_empty() {
            return Vec::new();
        }
        push_if_valid(
            &mut out,
            abs.anidb_id,
            SeasonMapping::Absolute(anime_range.shift(abs.offset)),
        );
        push_if_valid(
            &mut out,
            abs.anidb_id,
            SeasonMapping::Anime {
                season: 1,
                episodes: AnimeEpisodes::Range(anime_range),
            },
        );
        merge_scan(&mut out, group, anime_range, |r| r.tvdb_season > 0);
        return out;
    }

    // No absolute ordering anywhere: read the numbers as the best title's
    // own numbering.
    let Some((group, anidb_id)) = candidates.iter().find_map(|c| {
        let &g = group_index.get(&c.anidb_id)?;
        Some((groups[g], c.anidb_id))
    }) else {
        return Vec::new();
    };

    push_if_valid(
        &mut out,
        anidb_id,
        SeasonMapping::Anime {
            season: 1,
            episodes: AnimeEpisodes::Range(requested),
        },
    );
    merge_scan(&mut out, group, requested, |r| {
        r.anidb_season == 1 && r.tvdb_season >= 0
    });
    out
}

/// Walks a group's season windows in TVDB-season order, emitting one `Tv`
/// row per window that intersects the remaining range.
fn merge_scan(
    out: &mut Vec<TorrentMap>,
    group: &[EpisodeMap],
    range: EpisodeRange,
    eligible: impl Fn(&EpisodeMap) -> bool,
) {
    let mut remaining = range;

    for row in group {
        if !eligible(row) {
            continue;
        }

        let slice = remaining.intersect(row.anidb_range());
        if slice.is_empty() {
            continue;
        }

        push_if_valid(
            out,
            row.anidb_id,
            SeasonMapping::Tv {
                season: row.tvdb_season,
                range: slice.shift(row.offset),
            },
        );

        // An unbounded window swallows whatever is left.
        if row.end == 0 || slice.end >= remaining.end {
            break;
        }
        remaining = EpisodeRange::bounded(slice.end + 1, remaining.end);
    }
}

fn push_if_valid(out: &mut Vec<TorrentMap>, anidb_id: i32, mapping: SeasonMapping) {
    let range_ok = match &mapping {
        SeasonMapping::Absolute(range) | SeasonMapping::Tv { range, .. } => !range.is_empty(),
        SeasonMapping::Anime { episodes, .. } => match episodes {
            AnimeEpisodes::Range(range) => !range.is_empty(),
            AnimeEpisodes::List(list) => !list.is_empty(),
        },
    };
    if range_ok {
        out.push(TorrentMap { anidb_id, mapping });
    }
}
