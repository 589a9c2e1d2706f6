/// Dataset filtering
///
/// All filter state lives in an immutable [`FilterCriteria`] value that is
/// passed to the pure [`apply_filters`]. Every active criterion must hold for
/// a record to be kept.
use crate::extract::split_cleaned_tags;
use crate::normalize::{Dataset, NormalizedSetRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Fallbacks used by [`DatasetBounds`] when a column has no values
pub const DEFAULT_PLAY_RANGE: (u64, u64) = (0, 10_000);
pub const DEFAULT_FAV_RANGE: (u64, u64) = (0, 1_000);
pub const DEFAULT_ENERGY_RANGE: (u32, u32) = (0, 10);
pub const DEFAULT_BPM_RANGE: (u32, u32) = (60, 180);

/// Conjunctive filter over a dataset. `None` / empty means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Exact creator names
    pub names: Vec<String>,
    /// Case-insensitive substrings; a record matches if any one is found
    pub tags: Vec<String>,
    pub uploaded: Option<(NaiveDate, NaiveDate)>,
    pub plays: Option<(u64, u64)>,
    pub favs: Option<(u64, u64)>,
    /// Matched by interval overlap with the record's energy range
    pub energy: Option<(u32, u32)>,
    /// Matched by interval overlap with the record's BPM range
    pub bpm: Option<(u32, u32)>,
}

impl FilterCriteria {
    pub fn builder() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::default()
    }

    /// Whether no criterion is active
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &NormalizedSetRecord) -> bool {
        self.matches_name(record)
            && self.matches_tags(record)
            && in_range(record.date_uploaded, self.uploaded)
            && in_range(record.play_count, self.plays)
            && in_range(record.fav_count, self.favs)
            && overlaps(record.energy_min, record.energy_max, self.energy)
            && overlaps(record.bpm_min, record.bpm_max, self.bpm)
    }

    fn matches_name(&self, record: &NormalizedSetRecord) -> bool {
        self.names.is_empty() || self.names.iter().any(|name| *name == record.name)
    }

    fn matches_tags(&self, record: &NormalizedSetRecord) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let haystack = record.show_tags_cleaned.to_lowercase();
        self.tags
            .iter()
            .any(|tag| haystack.contains(&tag.to_lowercase()))
    }
}

fn in_range<T: PartialOrd + Copy>(value: Option<T>, range: Option<(T, T)>) -> bool {
    match (range, value) {
        (None, _) => true,
        (Some((lo, hi)), Some(value)) => lo <= value && value <= hi,
        (Some(_), None) => false,
    }
}

fn overlaps(min: Option<u32>, max: Option<u32>, range: Option<(u32, u32)>) -> bool {
    match (range, min, max) {
        (None, _, _) => true,
        (Some((lo, hi)), Some(min), Some(max)) => min <= hi && max >= lo,
        _ => false,
    }
}

/// Builder for [`FilterCriteria`]. Range bounds may be given in either order.
#[derive(Debug, Default)]
pub struct FilterCriteriaBuilder {
    criteria: FilterCriteria,
}

impl FilterCriteriaBuilder {
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.criteria.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn uploaded_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.criteria.uploaded = Some(ordered(from, to));
        self
    }

    pub fn plays_between(mut self, lo: u64, hi: u64) -> Self {
        self.criteria.plays = Some(ordered(lo, hi));
        self
    }

    pub fn favs_between(mut self, lo: u64, hi: u64) -> Self {
        self.criteria.favs = Some(ordered(lo, hi));
        self
    }

    pub fn energy_overlapping(mut self, lo: u32, hi: u32) -> Self {
        self.criteria.energy = Some(ordered(lo, hi));
        self
    }

    pub fn bpm_overlapping(mut self, lo: u32, hi: u32) -> Self {
        self.criteria.bpm = Some(ordered(lo, hi));
        self
    }

    pub fn build(self) -> FilterCriteria {
        self.criteria
    }
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Records of `dataset` matching `criteria`, in their original order
pub fn apply_filters(dataset: &Dataset, criteria: &FilterCriteria) -> Dataset {
    Dataset::new(
        dataset
            .iter()
            .filter(|record| criteria.matches(record))
            .cloned()
            .collect(),
    )
}

/// Sorted, de-duplicated tag tokens across the dataset (case preserved)
pub fn tag_vocabulary(dataset: &Dataset) -> Vec<String> {
    dataset
        .iter()
        .flat_map(|record| split_cleaned_tags(&record.show_tags_cleaned))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted, de-duplicated creator names
pub fn name_list(dataset: &Dataset) -> Vec<String> {
    dataset
        .iter()
        .map(|record| record.name.clone())
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Observed extent of each filterable column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub plays: (u64, u64),
    pub favs: (u64, u64),
    pub energy: (u32, u32),
    pub bpm: (u32, u32),
    /// `None` when no record has a resolved date
    pub uploaded: Option<(NaiveDate, NaiveDate)>,
}

impl DatasetBounds {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let records = &dataset.records;
        Self {
            plays: extent(records.iter().filter_map(|r| r.play_count)).unwrap_or(DEFAULT_PLAY_RANGE),
            favs: extent(records.iter().filter_map(|r| r.fav_count)).unwrap_or(DEFAULT_FAV_RANGE),
            energy: extent(
                records
                    .iter()
                    .flat_map(|r| r.energy_min.into_iter().chain(r.energy_max)),
            )
            .unwrap_or(DEFAULT_ENERGY_RANGE),
            bpm: extent(
                records
                    .iter()
                    .flat_map(|r| r.bpm_min.into_iter().chain(r.bpm_max)),
            )
            .unwrap_or(DEFAULT_BPM_RANGE),
            uploaded: extent(records.iter().filter_map(|r| r.date_uploaded)),
        }
    }

    /// Criteria spanning every observed value of every column
    pub fn to_criteria(&self) -> FilterCriteria {
        let builder = FilterCriteria::builder()
            .plays_between(self.plays.0, self.plays.1)
            .favs_between(self.favs.0, self.favs.1)
            .energy_overlapping(self.energy.0, self.energy.1)
            .bpm_overlapping(self.bpm.0, self.bpm.1);
        match self.uploaded {
            Some((from, to)) => builder.uploaded_between(from, to),
            None => builder,
        }
        .build()
    }
}

fn extent<T: Ord + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((lo, hi)) => Some((lo.min(value), hi.max(value))),
    })
}
