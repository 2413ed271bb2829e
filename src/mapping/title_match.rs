//! Ranks candidate AniDB title variants against a parsed release.
//!
//! Ranking is plain edit distance with one override: a candidate whose
//! catalogue year equals the release year always wins over one whose year
//! differs, because franchises reuse titles across remakes. Acceptance is a
//! separate token-set fuzzy gate so that a badly ranked list can still be
//! rejected wholesale.

use strsim::{levenshtein, normalized_levenshtein};

use crate::models::{AniDbTitle, ParsedRelease};

/// Release-type tags that change how AniDB names an entry. AniDB prefers
/// "OAV" where release groups write "OVA"; both fold to one token so the
/// spelling costs no edit distance.
fn normalize_release_type(tag: &str) -> Option<&'static str> {
    match tag.to_lowercase().as_str() {
        "ova" | "oav" => Some("ova"),
        "oad" | "oda" => Some("oad"),
        _ => None,
    }
}

fn fold_synonyms(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .map(|token| match token {
            "oav" => "ova",
            "oda" => "oad",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matcher for one release; holds the prepared comparison string.
#[derive(Debug)]
pub struct TitleMatcher {
    comparison: String,
    release_title: String,
    target_year: i32,
}

impl TitleMatcher {
    #[must_use]
    pub fn new(release: &ParsedRelease) -> Self {
        let mut comparison = release.title.to_lowercase();

        // A lone release-type tag (OVA, OAD) that the raw name does not
        // already spell out disambiguates entries sharing a base title.
        if let [tag] = release.release_types.as_slice()
            && let Some(token) = normalize_release_type(tag)
            && !release.torrent_title.to_lowercase().contains(token)
        {
            comparison.push(' ');
            comparison.push_str(token);
        }

        Self {
            comparison: fold_synonyms(&comparison),
            release_title: release.title.to_lowercase(),
            target_year: release.year,
        }
    }

    /// Edit distance from the prepared comparison string to a candidate.
    #[must_use]
    pub fn distance(&self, candidate: &AniDbTitle) -> usize {
        levenshtein(&self.comparison, &fold_synonyms(&candidate.value))
    }

    /// Stable-sorts candidates ascending by distance, with year-equal
    /// candidates strictly first when the release year is known. Ties keep
    /// their original order.
    #[must_use]
    pub fn rank(&self, candidates: Vec<AniDbTitle>) -> Vec<AniDbTitle> {
        let mut ranked: Vec<(usize, usize, AniDbTitle)> = candidates
            .into_iter()
            .map(|c| {
                let year_priority =
                    usize::from(!(self.target_year > 0 && c.year == self.target_year));
                (year_priority, self.distance(&c), c)
            })
            .collect();

        ranked.sort_by_key(|(priority, distance, _)| (*priority, *distance));
        ranked.into_iter().map(|(_, _, c)| c).collect()
    }

    /// Acceptance gate: token-set similarity of the candidate against the
    /// release title, scaled 0-100, must reach `threshold`. Failing the
    /// gate means "unmapped", never an error.
    #[must_use]
    pub fn accepts(&self, candidate: &AniDbTitle, threshold: u32) -> bool {
        token_set_ratio(&candidate.value, &self.release_title) >= threshold
    }
}

fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Token-set similarity ratio (0-100).
///
/// Both strings are tokenized; the sorted intersection and each side's
/// leftover tokens form three comparison strings whose best pairwise
/// normalized edit similarity is the score. Word order and duplicated
/// tokens therefore cost nothing.
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> u32 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let mut intersection: Vec<&String> =
        tokens_a.iter().filter(|t| tokens_b.contains(t)).collect();
    intersection.sort();
    intersection.dedup();

    let mut rest_a: Vec<&String> = tokens_a.iter().filter(|t| !tokens_b.contains(t)).collect();
    rest_a.sort();
    rest_a.dedup();
    let mut rest_b: Vec<&String> = tokens_b.iter().filter(|t| !tokens_a.contains(t)).collect();
    rest_b.sort();
    rest_b.dedup();

    let joined = |tokens: &[&String]| {
        tokens
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let base = joined(&intersection);
    let combined_a = if rest_a.is_empty() {
        base.clone()
    } else if base.is_empty() {
        joined(&rest_a)
    } else {
        format!("{base} {}", joined(&rest_a))
    };
    let combined_b = if rest_b.is_empty() {
        base.clone()
    } else if base.is_empty() {
        joined(&rest_b)
    } else {
        format!("{base} {}", joined(&rest_b))
    };

    let score = [
        normalized_levenshtein(&base, &combined_a),
        normalized_levenshtein(&base, &combined_b),
        normalized_levenshtein(&combined_a, &combined_b),
    ]
    .into_iter()
    .fold(0.0_f64, f64::max);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ratio = (score * 100.0).round() as u32;
    ratio
}
