//! Reconciles anime episode/season identity across AniDB, TVDB-style
//! seasonal, and franchise-absolute numbering, and resolves parsed torrent
//! releases against the reconciled correspondence tables.
//!
//! The crate is a pure engine: it performs no I/O and owns no schedule.
//! Raw season-mapping declarations go in through
//! [`mapping::EpisodeMapBuilder`]; a parsed release plus candidate titles
//! and loaded rows go through [`mapping::resolver::resolve`] (or the
//! [`mapping::MappingEngine`] glue over caller-supplied lookups); association
//! rows come out for the caller to persist.

pub mod config;
pub mod mapping;
pub mod models;

pub use config::MatchConfig;
pub use mapping::{
    AnimeDeclaration, EpisodeMap, EpisodeMapBuilder, EpisodeMapLookup, MappingEngine,
    ResolveError, SeasonRule, TitleLookup, TitleMatcher,
};
pub use models::{
    AniDbTitle, AnimeEpisodes, AssociationRow, EpisodeRange, ParsedRelease, SeasonMapping,
    SeasonType, TorrentMap,
};
