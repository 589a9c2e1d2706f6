/// Dataset normalization: raw set records into typed, filterable rows
use crate::extract::{
    clean_tags, extract_range_from_blocks, parse_count, resolve_relative_date, IntRange, RangeKind,
    FAVORITES_SUFFIX, PLAYS_SUFFIX,
};
use crate::parser::{ProfileRecord, RawSetRecord};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Placeholder for a missing info block in the combined text
pub const MISSING_INFO: &str = "no info";

/// Output columns, in order
pub const COLUMNS: [&str; 19] = [
    "name",
    "title",
    "play_count",
    "fav_count",
    "date_posted_raw",
    "date_uploaded",
    "show_tags",
    "show_tags_cleaned",
    "energy_min",
    "energy_max",
    "bpm_min",
    "bpm_max",
    "info_block_1",
    "info_block_2",
    "info_block_3",
    "info_block_4",
    "artists_list",
    "show_info_combined",
    "show_url",
];

/// One dataset row. Field order matches [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSetRecord {
    pub name: String,
    pub title: Option<String>,
    pub play_count: Option<u64>,
    pub fav_count: Option<u64>,
    pub date_posted_raw: Option<String>,
    /// Absolute date resolved against the run's snapshot
    pub date_uploaded: Option<NaiveDate>,
    pub show_tags: Vec<String>,
    pub show_tags_cleaned: String,
    pub energy_min: Option<u32>,
    pub energy_max: Option<u32>,
    pub bpm_min: Option<u32>,
    pub bpm_max: Option<u32>,
    pub info_block_1: Option<String>,
    pub info_block_2: Option<String>,
    pub info_block_3: Option<String>,
    pub info_block_4: Option<String>,
    pub artists_list: Option<String>,
    pub show_info_combined: String,
    pub show_url: String,
}

impl NormalizedSetRecord {
    pub fn energy(&self) -> Option<IntRange> {
        pair(self.energy_min, self.energy_max)
    }

    pub fn bpm(&self) -> Option<IntRange> {
        pair(self.bpm_min, self.bpm_max)
    }

    pub fn info_blocks(&self) -> [Option<&str>; 4] {
        [
            self.info_block_1.as_deref(),
            self.info_block_2.as_deref(),
            self.info_block_3.as_deref(),
            self.info_block_4.as_deref(),
        ]
    }
}

fn pair(min: Option<u32>, max: Option<u32>) -> Option<IntRange> {
    match (min, max) {
        (Some(min), Some(max)) => Some(IntRange::new(min, max)),
        _ => None,
    }
}

/// Resolves a batch of raw records against one "now"
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    snapshot: NaiveDateTime,
}

impl Normalizer {
    /// Normalizer pinned to the current local time
    pub fn new() -> Self {
        Self::with_snapshot(Local::now().naive_local())
    }

    pub fn with_snapshot(snapshot: NaiveDateTime) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> NaiveDateTime {
        self.snapshot
    }

    /// One output row per input record, in input order
    pub fn normalize(&self, raw: &[RawSetRecord]) -> Vec<NormalizedSetRecord> {
        let records: Vec<_> = raw.iter().map(|record| self.normalize_one(record)).collect();
        debug!("Normalized {} set record(s) at {}", records.len(), self.snapshot);
        records
    }

    pub fn normalize_one(&self, raw: &RawSetRecord) -> NormalizedSetRecord {
        let energy = extract_range_from_blocks(RangeKind::Energy, &raw.info_blocks);
        let bpm = extract_range_from_blocks(RangeKind::Bpm, &raw.info_blocks);
        let [info_block_1, info_block_2, info_block_3, info_block_4] = raw.info_blocks.clone();

        NormalizedSetRecord {
            name: raw.name.clone(),
            title: raw.title.clone(),
            play_count: raw
                .play_count_raw
                .as_deref()
                .and_then(|text| parse_count(text, PLAYS_SUFFIX)),
            fav_count: raw
                .fav_count_raw
                .as_deref()
                .and_then(|text| parse_count(text, FAVORITES_SUFFIX)),
            date_posted_raw: raw.date_posted_raw.clone(),
            date_uploaded: raw
                .date_posted_raw
                .as_deref()
                .and_then(|text| resolve_relative_date(text, self.snapshot)),
            show_tags: raw.tags.clone(),
            show_tags_cleaned: clean_tags(&raw.tags),
            energy_min: energy.map(|r| r.min),
            energy_max: energy.map(|r| r.max),
            bpm_min: bpm.map(|r| r.min),
            bpm_max: bpm.map(|r| r.max),
            show_info_combined: combine_info_blocks(&raw.info_blocks),
            info_block_1,
            info_block_2,
            info_block_3,
            info_block_4,
            artists_list: raw.artists.clone(),
            show_url: raw.url.clone(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize against the current time
pub fn normalize(raw: &[RawSetRecord]) -> Vec<NormalizedSetRecord> {
    Normalizer::new().normalize(raw)
}

/// Labelled concatenation of the info blocks
pub fn combine_info_blocks(blocks: &[Option<String>]) -> String {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| {
            format!(
                "show_info_{}:\n{}",
                i + 1,
                block.as_deref().unwrap_or(MISSING_INFO)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The typed dataset handed to downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<NormalizedSetRecord>,
}

/// A set row paired with the profile that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub profile: ProfileRecord,
    pub set: NormalizedSetRecord,
}

impl Dataset {
    pub fn new(records: Vec<NormalizedSetRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedSetRecord> {
        self.records.iter()
    }

    /// Inner join on name; rows without a matching profile are left out
    pub fn join_profiles(&self, profiles: &[ProfileRecord]) -> Vec<JoinedRow> {
        let by_name: HashMap<&str, &ProfileRecord> = profiles
            .iter()
            .map(|profile| (profile.name.as_str(), profile))
            .collect();

        self.records
            .iter()
            .filter_map(|set| {
                by_name.get(set.name.as_str()).map(|profile| JoinedRow {
                    profile: (*profile).clone(),
                    set: set.clone(),
                })
            })
            .collect()
    }
}

impl From<Vec<NormalizedSetRecord>> for Dataset {
    fn from(records: Vec<NormalizedSetRecord>) -> Self {
        Self::new(records)
    }
}
