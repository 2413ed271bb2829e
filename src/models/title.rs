use serde::{Deserialize, Serialize};

/// Kind of an AniDB title row. The upstream dump tags each variant; the
/// `clean-*` family carries pre-normalized values keyed by the cleaning kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TitleVariant {
    Main,
    Official,
    Synonym,
    Clean(String),
}

impl TitleVariant {
    /// Parses the upstream variant tag. Unknown tags are treated as synonyms
    /// so a dump format addition never drops rows.
    ///
    /// For the caller's title-ingestion path; the engine itself receives
    /// already-typed rows through [`crate::mapping::TitleLookup`].
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        match tag {
            "main" => Self::Main,
            "official" => Self::Official,
            "syn" => Self::Synonym,
            other => other.strip_prefix("clean-").map_or(Self::Synonym, |kind| {
                Self::Clean(kind.to_string())
            }),
        }
    }
}

/// One title variant for one AniDB entry. Many rows share an `anidb_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AniDbTitle {
    pub anidb_id: i32,

    pub variant: TitleVariant,

    pub language: String,

    pub value: String,

    /// "1" unless the entry is explicitly the specials pseudo-season "0".
    pub season: String,

    /// 0 = unknown.
    pub year: i32,
}

impl AniDbTitle {
    /// Season as a number, discarding noise values.
    ///
    /// The upstream dump occasionally carries zero-padded or multi-digit
    /// season strings from scraping accidents; only a bare "0" or "1" is
    /// trusted. Ingestion callers drop rows where this returns `None`.
    #[must_use]
    pub fn normalized_season(&self) -> Option<i32> {
        match self.season.as_str() {
            "0" => Some(0),
            "1" => Some(1),
            _ => None,
        }
    }
}
