pub mod release;
pub mod title;
pub mod torrent_map;

pub use release::ParsedRelease;
pub use title::{AniDbTitle, TitleVariant};
pub use torrent_map::{
    AnimeEpisodes, AssociationRow, EpisodeRange, SeasonMapping, SeasonType, TorrentMap,
};
