//! Builds normalized [`EpisodeMap`] rows from raw per-anime season-mapping
//! declarations sharing one TVDB id.
//!
//! Upstream declarations arrive string-typed from the dataset pipeline and
//! are frequently sloppy: missing season-1 rules, absolute-order sentinels,
//! malformed numbers. A malformed field skips only its own declaration or
//! rule; the batch always finishes, and every skip is reported back so the
//! caller (and tests) can account for them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::episode_map::{ABSOLUTE_SEASON, EpisodeMap};

/// Sentinel used by the upstream dataset for "this entry maps to absolute
/// ordering, not a real TVDB season".
const ABSOLUTE_SENTINEL: &str = "a";

/// Raw per-anime declaration as delivered by the dataset pipeline. All
/// numeric fields are strings until the builder vets them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimeDeclaration {
    pub anidb_id: String,

    /// A season number, or `"a"` for absolute ordering.
    pub default_tvdb_season: String,

    pub episode_offset: String,

    /// `;special-regular;...` pair list placing specials in airing order.
    pub before: Option<String>,

    pub rules: Vec<SeasonRule>,
}

/// One explicit per-season rule inside a declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonRule {
    pub anidb_season: String,

    pub tvdb_season: String,

    pub start: Option<String>,

    pub end: Option<String>,

    pub offset: Option<String>,

    /// `;anidb-tvdb;anidb-tvdb1+tvdb2;...` non-linear insertions.
    pub map: Option<String>,
}

/// What a skip applied to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipScope {
    Declaration,
    Rule,
    Segment,
}

/// One skipped unit, with the offending field and raw value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSkip {
    pub anidb_id: String,
    pub scope: SkipScope,
    pub field: String,
    pub value: String,
}

/// Per-batch diagnostics returned alongside the rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub skips: Vec<BuildSkip>,
}

impl BuildReport {
    fn skip(&mut self, anidb_id: &str, scope: SkipScope, field: &str, value: &str) {
        warn!(anidb_id, field, value, ?scope, "skipping unparsable mapping field");
        self.skips.push(BuildSkip {
            anidb_id: anidb_id.to_string(),
            scope,
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

/// Rows plus skip accounting for one build batch.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub rows: Vec<EpisodeMap>,
    pub report: BuildReport,
}

/// Accumulates rows for one TVDB id across declarations.
///
/// Rows are upserted by `(anidb_id, anidb_season, tvdb_season)` through an
/// explicit key-to-index map over a growable vec, so later rules can mutate
/// earlier rows without holding references into the collection.
#[derive(Debug)]
pub struct EpisodeMapBuilder {
    tvdb_id: i32,
    rows: Vec<EpisodeMap>,
    index: HashMap<(i32, i32, i32), usize>,
    report: BuildReport,
}

impl EpisodeMapBuilder {
    #[must_use]
    pub fn new(tvdb_id: i32) -> Self {
        Self {
            tvdb_id,
            rows: Vec::new(),
            index: HashMap::new(),
            report: BuildReport::default(),
        }
    }

    /// Builds the full row set for `tvdb_id` from an ordered declaration
    /// batch. Output row order is deterministic but unsorted; callers run
    /// [`super::episode_map::sort_rows`] before querying.
    #[must_use]
    pub fn build(tvdb_id: i32, declarations: &[AnimeDeclaration]) -> BuildOutput {
        let mut builder = Self::new(tvdb_id);
        for declaration in declarations {
            builder.add_declaration(declaration);
        }
        builder.finish()
    }

    pub fn add_declaration(&mut self, declaration: &AnimeDeclaration) {
        let raw_id = &declaration.anidb_id;

        let Ok(anidb_id) = declaration.anidb_id.trim().parse::<i32>() else {
            self.report
                .skip(raw_id, SkipScope::Declaration, "anidb_id", raw_id);
            return;
        };

        let Some(offset) = self.parse_declaration_field(
            raw_id,
            "episode_offset",
            &declaration.episode_offset,
        ) else {
            return;
        };

        let default_season = declaration.default_tvdb_season.trim();
        let default_index = if default_season == ABSOLUTE_SENTINEL {
            let index = self.upsert(anidb_id, 1, ABSOLUTE_SEASON);
            let row = &mut self.rows[index];
            row.start = 1;
            row.offset = offset;
            index
        } else {
            let Some(season) =
                self.parse_declaration_field(raw_id, "default_tvdb_season", default_season)
            else {
                return;
            };
            let index = self.upsert(anidb_id, 1, season);
            self.rows[index].offset = offset;
            index
        };

        if let Some(before) = &declaration.before {
            let pairs = self.parse_pair_list(raw_id, "before", before);
            self.rows[default_index].before.extend(pairs);
        }

        for rule in &declaration.rules {
            self.add_rule(anidb_id, raw_id, rule);
        }
    }

    #[must_use]
    pub fn finish(self) -> BuildOutput {
        BuildOutput {
            rows: self.rows,
            report: self.report,
        }
    }

    fn add_rule(&mut self, anidb_id: i32, raw_id: &str, rule: &SeasonRule) {
        let Some(anidb_season) = self.parse_rule_field(raw_id, "anidb_season", &rule.anidb_season)
        else {
            return;
        };
        let Some(tvdb_season) = self.parse_rule_field(raw_id, "tvdb_season", &rule.tvdb_season)
        else {
            return;
        };

        let mut start = None;
        let mut end = None;
        let mut offset = None;
        for (field, raw, slot) in [
            ("start", &rule.start, &mut start),
            ("end", &rule.end, &mut end),
            ("offset", &rule.offset, &mut offset),
        ] {
            if let Some(raw) = raw {
                match raw.trim().parse::<i32>() {
                    Ok(value) => *slot = Some(value),
                    Err(_) => {
                        self.report.skip(raw_id, SkipScope::Rule, field, raw);
                        return;
                    }
                }
            }
        }

        let key = (anidb_id, anidb_season, tvdb_season);
        let is_new = !self.index.contains_key(&key);

        // Upstream declarations frequently omit season 1: a fresh season-2
        // rule with a start bound implies season 1 covered everything
        // before it.
        if is_new
            && tvdb_season == 2
            && anidb_season == 1
            && !self.index.contains_key(&(anidb_id, 1, 1))
            && let Some(rule_start) = start
            && rule_start > 1
        {
            let inferred = self.upsert(anidb_id, 1, 1);
            let row = &mut self.rows[inferred];
            row.start = 1;
            row.end = rule_start - 1;
            row.offset = rule_start - 1 + offset.unwrap_or(0);
        }

        let index = self.upsert(anidb_id, anidb_season, tvdb_season);
        if let Some(start) = start {
            self.rows[index].start = start;
        }
        if let Some(end) = end {
            self.rows[index].end = end;
        }
        if let Some(offset) = offset {
            self.rows[index].offset = offset;
        }
        if let Some(map) = &rule.map {
            let pairs = self.parse_map_list(raw_id, map);
            self.rows[index].explicit.extend(pairs);
        }

        // Absolute coverage grows as regular seasons are discovered.
        if let Some(end) = end
            && let Some(&abs) = self.index.get(&(anidb_id, 1, ABSOLUTE_SEASON))
        {
            let row = &mut self.rows[abs];
            row.end = row.end.max(end);
        }
    }

    /// Key-to-index upsert; the returned index stays valid because rows are
    /// only ever appended.
    fn upsert(&mut self, anidb_id: i32, anidb_season: i32, tvdb_season: i32) -> usize {
        let key = (anidb_id, anidb_season, tvdb_season);
        if let Some(&index) = self.index.get(&key) {
            return index;
        }

        self.rows.push(EpisodeMap {
            anidb_id,
            tvdb_id: self.tvdb_id,
            anidb_season,
            tvdb_season,
            ..Default::default()
        });
        let index = self.rows.len() - 1;
        self.index.insert(key, index);
        index
    }

    fn parse_declaration_field(&mut self, anidb_id: &str, field: &str, raw: &str) -> Option<i32> {
        match raw.trim().parse::<i32>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report.skip(anidb_id, SkipScope::Declaration, field, raw);
                None
            }
        }
    }

    fn parse_rule_field(&mut self, anidb_id: &str, field: &str, raw: &str) -> Option<i32> {
        match raw.trim().parse::<i32>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.report.skip(anidb_id, SkipScope::Rule, field, raw);
                None
            }
        }
    }

    /// Parses `;a-b;c-d;` lists. Malformed segments are reported and
    /// dropped; well-formed neighbours survive.
    fn parse_pair_list(&mut self, anidb_id: &str, field: &str, raw: &str) -> Vec<(i32, i32)> {
        let mut pairs = Vec::new();
        for segment in raw.split(';').filter(|s| !s.trim().is_empty()) {
            let parsed = segment
                .split_once('-')
                .and_then(|(a, b)| Some((a.trim().parse().ok()?, b.trim().parse().ok()?)));
            match parsed {
                Some(pair) => pairs.push(pair),
                None => self.report.skip(anidb_id, SkipScope::Segment, field, segment),
            }
        }
        pairs
    }

    /// Parses `;anidb-tvdb1+tvdb2;` explicit-map lists.
    fn parse_map_list(&mut self, anidb_id: &str, raw: &str) -> Vec<(i32, Vec<i32>)> {
        let mut entries = Vec::new();
        for segment in raw.split(';').filter(|s| !s.trim().is_empty()) {
            let parsed = segment.split_once('-').and_then(|(a, b)| {
                let anidb_ep: i32 = a.trim().parse().ok()?;
                let tvdb_eps = b
                    .split('+')
                    .map(|e| e.trim().parse::<i32>())
                    .collect::<Result<Vec<_>, _>>()
                    .ok()?;
                Some((anidb_ep, tvdb_eps))
            });
            match parsed {
                Some(entry) => entries.push(entry),
                None => self.report.skip(anidb_id, SkipScope::Segment, "map", segment),
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::episode_map;

    fn declaration(anidb_id: &str, default_season: &str, offset: &str) -> AnimeDeclaration {
        AnimeDeclaration {
            anidb_id: anidb_id.to_string(),
            default_tvdb_season: default_season.to_string(),
            episode_offset: offset.to_string(),
            before: None,
            rules: Vec::new(),
        }
    }

    fn rule(anidb_season: &str, tvdb_season: &str) -> SeasonRule {
        SeasonRule {
            anidb_season: anidb_season.to_string(),
            tvdb_season: tvdb_season.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_row_regular_season() {
        let out = EpisodeMapBuilder::build(293_088, &[declaration("12430", "2", "0")]);
        assert!(out.report.skips.is_empty());
        assert_eq!(out.rows.len(), 1);

        let row = &out.rows[0];
        assert_eq!(row.anidb_id, 12430);
        assert_eq!(row.tvdb_id, 293_088);
        assert_eq!(row.anidb_season, 1);
        assert_eq!(row.tvdb_season, 2);
        assert_eq!(row.offset, 0);
    }

    #[test]
    fn test_default_row_absolute_sentinel() {
        let out = EpisodeMapBuilder::build(81797, &[declaration("69", "a", "0")]);
        let row = &out.rows[0];
        assert!(row.is_absolute_order());
        assert_eq!(row.anidb_season, 1);
        assert_eq!(row.start, 1);
        assert_eq!(row.end, 0);
    }

    #[test]
    fn test_absolute_end_accumulates_across_rules() {
        let mut decl = declaration("69", "a", "0");
        let mut s1 = rule("1", "1");
        s1.start = Some("1".to_string());
        s1.end = Some("8".to_string());
        s1.offset = Some("0".to_string());
        let mut s2 = rule("1", "2");
        s2.start = Some("9".to_string());
        s2.end = Some("30".to_string());
        s2.offset = Some("-8".to_string());
        decl.rules = vec![s1, s2];

        let out = EpisodeMapBuilder::build(81797, &[decl]);
        let abs = out
            .rows
            .iter()
            .find(|r| r.is_absolute_order())
            .expect("absolute row");
        assert_eq!(abs.end, 30);
    }

    #[test]
    fn test_rule_mutates_existing_row_in_place() {
        let mut decl = declaration("12430", "2", "0");
        let mut update = rule("1", "2");
        update.start = Some("1".to_string());
        update.end = Some("12".to_string());
        decl.rules = vec![update];

        let out = EpisodeMapBuilder::build(293_088, &[decl]);
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].start, 1);
        assert_eq!(out.rows[0].end, 12);
        // The rule did not specify an offset, so the default row's survives.
        assert_eq!(out.rows[0].offset, 0);
    }

    #[test]
    fn test_season_one_inference() {
        let mut decl = declaration("9999", "1", "0");
        let mut s2 = rule("1", "2");
        s2.start = Some("13".to_string());
        s2.end = Some("24".to_string());
        s2.offset = Some("-12".to_string());
        decl.rules = vec![s2];

        // No explicit season-1 rule: the builder synthesizes one from the
        // season-2 start bound... except a (1, 1) row already exists here
        // from the default season. Use a default season of 3 to leave the
        // (1, 1) slot empty.
        let mut decl_no_s1 = declaration("9999", "3", "0");
        decl_no_s1.rules = decl.rules.clone();

        let out = EpisodeMapBuilder::build(100, &[decl_no_s1]);
        let inferred = out
            .rows
            .iter()
            .find(|r| r.tvdb_season == 1)
            .expect("inferred season-1 row");
        assert_eq!(inferred.start, 1);
        assert_eq!(inferred.end, 12);
        assert_eq!(inferred.offset, 0);

        // With a (1, 1) row already present, nothing is synthesized twice.
        let out2 = EpisodeMapBuilder::build(100, &[declaration("9999", "1", "0"), {
            let mut d = declaration("9999", "1", "0");
            d.rules = decl.rules;
            d
        }]);
        assert_eq!(out2.rows.iter().filter(|r| r.tvdb_season == 1).count(), 1);
    }

    #[test]
    fn test_before_override_parsing() {
        let mut decl = declaration("11637", "0", "0");
        decl.before = Some(";1-5;3-10;".to_string());

        let out = EpisodeMapBuilder::build(293_088, &[decl]);
        let row = &out.rows[0];
        assert_eq!(row.before.get(&1), Some(&5));
        assert_eq!(row.before.get(&3), Some(&10));
    }

    #[test]
    fn test_explicit_map_parsing() {
        let mut decl = declaration("11637", "0", "0");
        let mut r = rule("1", "0");
        r.map = Some(";1-7;2-8+9;".to_string());
        decl.rules = vec![r];

        let out = EpisodeMapBuilder::build(293_088, &[decl]);
        let row = &out.rows[0];
        assert_eq!(row.explicit.get(&1), Some(&vec![7]));
        assert_eq!(row.explicit.get(&2), Some(&vec![8, 9]));
    }

    #[test]
    fn test_unparsable_declaration_is_skipped_batch_continues() {
        let out = EpisodeMapBuilder::build(
            100,
            &[
                declaration("not-a-number", "1", "0"),
                declaration("10", "1", "zero"),
                declaration("11", "1", "0"),
            ],
        );

        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].anidb_id, 11);
        assert_eq!(out.report.skips.len(), 2);
        assert_eq!(out.report.skips[0].field, "anidb_id");
        assert_eq!(out.report.skips[0].scope, SkipScope::Declaration);
        assert_eq!(out.report.skips[1].field, "episode_offset");
    }

    #[test]
    fn test_unparsable_rule_is_skipped_batch_continues() {
        let mut decl = declaration("10", "1", "0");
        let mut bad = rule("1", "2");
        bad.start = Some("thirteen".to_string());
        decl.rules = vec![bad, rule("0", "0")];

        let out = EpisodeMapBuilder::build(100, &[decl]);
        assert_eq!(out.report.skips.len(), 1);
        assert_eq!(out.report.skips[0].scope, SkipScope::Rule);
        // The default row and the good specials rule both survive.
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn test_malformed_segment_keeps_neighbours() {
        let mut decl = declaration("10", "0", "0");
        decl.before = Some(";1-5;bogus;2-9;".to_string());

        let out = EpisodeMapBuilder::build(100, &[decl]);
        assert_eq!(out.rows[0].before.len(), 2);
        assert_eq!(out.report.skips.len(), 1);
        assert_eq!(out.report.skips[0].scope, SkipScope::Segment);
    }

    #[test]
    fn test_output_sorts_into_canonical_order() {
        let mut decl = declaration("10", "a", "0");
        let mut s2 = rule("1", "2");
        s2.start = Some("13".to_string());
        s2.end = Some("24".to_string());
        let mut s1 = rule("1", "1");
        s1.start = Some("1".to_string());
        s1.end = Some("12".to_string());
        decl.rules = vec![s2, s1];

        let mut out = EpisodeMapBuilder::build(100, &[decl]);
        episode_map::sort_rows(&mut out.rows);
        let seasons: Vec<_> = out.rows.iter().map(|r| r.tvdb_season).collect();
        assert_eq!(seasons, vec![-1, 1, 2]);
    }
}
