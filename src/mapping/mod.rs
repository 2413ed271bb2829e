//! Episode/season identifier reconciliation.
//!
//! The submodules form a pipeline: [`builder`] normalizes raw upstream
//! declarations into [`episode_map::EpisodeMap`] rows, [`title_match`]
//! ranks candidate AniDB titles for a release, and [`resolver`] turns the
//! two plus a parsed release into numbering-scheme-tagged episode ranges.
//! [`MappingEngine`] is the glue that drives the pipeline over the caller's
//! lookup implementations.

pub mod builder;
pub mod episode_map;
pub mod resolver;
pub mod title_match;

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::config::MatchConfig;
use crate::models::{AniDbTitle, AssociationRow, ParsedRelease};

pub use builder::{AnimeDeclaration, BuildOutput, BuildReport, EpisodeMapBuilder, SeasonRule};
pub use episode_map::EpisodeMap;
pub use title_match::TitleMatcher;

/// Errors surfaced by [`MappingEngine`]. Parse problems never appear here
/// (the builder reports them as skips); a failed external lookup aborts
/// resolution for that one release only.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] anyhow::Error),
}

/// External AniDB title search, supplied by the caller.
pub trait TitleLookup {
    fn candidate_titles(
        &self,
        term: &str,
        season_hint: Option<i32>,
        year_hint: Option<i32>,
    ) -> anyhow::Result<Vec<AniDbTitle>>;
}

/// External episode-map store, supplied by the caller.
pub trait EpisodeMapLookup {
    /// All rows for one AniDB id; with `include_tvdb_siblings`, also every
    /// row sharing any of its TVDB ids.
    fn maps_for_anidb(
        &self,
        anidb_id: i32,
        include_tvdb_siblings: bool,
    ) -> anyhow::Result<Vec<EpisodeMap>>;
}

/// Drives one release through lookup, ranking, gating and resolution.
///
/// Pure and synchronous: every invocation works on snapshots and call-local
/// scratch state, so callers may resolve many releases concurrently over
/// shared lookups.
pub struct MappingEngine<'a, T, M> {
    titles: &'a T,
    maps: &'a M,
    config: MatchConfig,
}

impl<'a, T: TitleLookup, M: EpisodeMapLookup> MappingEngine<'a, T, M> {
    #[must_use]
    pub const fn new(titles: &'a T, maps: &'a M, config: MatchConfig) -> Self {
        Self {
            titles,
            maps,
            config,
        }
    }

    /// Resolves one release into association rows for `hash`. An empty vec
    /// is the normal "no mapping" outcome; only lookup failures error.
    pub fn resolve_release(
        &self,
        release: &ParsedRelease,
        hash: &str,
    ) -> Result<Vec<AssociationRow>, ResolveError> {
        let matcher = TitleMatcher::new(release);

        let season_hint = release.seasons.first().copied();
        let year_hint = (release.year > 0).then_some(release.year);
        let found = self
            .titles
            .candidate_titles(&release.title, season_hint, year_hint)?;

        let ranked = matcher.rank(found);
        let Some(best) = ranked.first() else {
            return Ok(Vec::new());
        };
        if !matcher.accepts(best, self.config.fuzzy_threshold) {
            debug!(
                title = %release.title,
                candidate = %best.value,
                "best title candidate below fuzzy threshold, leaving unmapped"
            );
            return Ok(Vec::new());
        }

        let candidates: Vec<AniDbTitle> = ranked
            .into_iter()
            .filter(|c| matcher.accepts(c, self.config.fuzzy_threshold))
            .collect();

        let mut rows = Vec::new();
        let mut loaded = HashSet::new();
        for candidate in &candidates {
            if loaded.insert(candidate.anidb_id) {
                rows.extend(self.maps.maps_for_anidb(candidate.anidb_id, true)?);
            }
        }
        // Sibling loads overlap when candidates share a TVDB id.
        let mut row_keys = HashSet::new();
        rows.retain(|r| row_keys.insert((r.anidb_id, r.tvdb_id, r.anidb_season, r.tvdb_season)));

        let maps = resolver::resolve(release, &candidates, &rows, &self.config);
        Ok(maps
            .into_iter()
            .map(|m| m.into_association(hash))
            .collect())
    }
}
