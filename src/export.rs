/// Persisting and reloading scrape output
///
/// A run is handed off as two CSV tables (profile and sets) plus an optional
/// JSON artifact. Missing values are written as empty cells and read back as
/// `None`.
use crate::config::{ExportFormat, OutputConfig};
use crate::error::{Result, ScrapeError};
use crate::normalize::{Dataset, NormalizedSetRecord, COLUMNS};
use crate::parser::ProfileRecord;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Writer};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Profile table header
pub const PROFILE_COLUMNS: [&str; 4] = ["dj_name", "dj_info", "dj_followers", "dj_following"];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Serialize)]
struct JsonArtifact<'a> {
    profile: &'a ProfileRecord,
    records: &'a [NormalizedSetRecord],
}

/// Writes run output into a directory
#[derive(Debug, Clone)]
pub struct Exporter {
    output_dir: PathBuf,
    formats: Vec<ExportFormat>,
}

impl Exporter {
    pub fn new(output_dir: impl Into<PathBuf>, formats: Vec<ExportFormat>) -> Self {
        Self {
            output_dir: output_dir.into(),
            formats,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.output_dir.clone(), config.formats.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write every configured format under `stem`; returns the files written
    pub async fn export(
        &self,
        stem: &str,
        profile: &ProfileRecord,
        dataset: &Dataset,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let mut written = Vec::new();

        if self.formats.contains(&ExportFormat::CSV) {
            let profile_path = self.output_dir.join(format!("{}_profile.csv", stem));
            tokio::fs::write(&profile_path, profile_csv(profile)?).await?;
            written.push(profile_path);

            let sets_path = self.output_dir.join(format!("{}_sets.csv", stem));
            tokio::fs::write(&sets_path, sets_csv(dataset)?).await?;
            written.push(sets_path);
        }

        if self.formats.contains(&ExportFormat::JSON) {
            let json_path = self.output_dir.join(format!("{}_sets.json", stem));
            let artifact = JsonArtifact {
                profile,
                records: &dataset.records,
            };
            tokio::fs::write(&json_path, serde_json::to_string_pretty(&artifact)?).await?;
            written.push(json_path);
        }

        for path in &written {
            info!("💾 Wrote {}", path.display());
        }
        Ok(written)
    }
}

/// Profile table as CSV bytes
pub fn profile_csv(profile: &ProfileRecord) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(PROFILE_COLUMNS)?;
    writer.write_record([
        profile.name.clone(),
        cell(profile.bio.as_ref()),
        cell(profile.followers.as_ref()),
        cell(profile.following.as_ref()),
    ])?;
    finish(writer)
}

/// Sets table as CSV bytes, columns in [`COLUMNS`] order
pub fn sets_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in dataset.iter() {
        writer.write_record(set_row(record))?;
    }
    finish(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ScrapeError::Io(e.into_error()))
}

fn set_row(record: &NormalizedSetRecord) -> [String; 19] {
    [
        record.name.clone(),
        cell(record.title.as_ref()),
        cell(record.play_count.as_ref()),
        cell(record.fav_count.as_ref()),
        cell(record.date_posted_raw.as_ref()),
        record
            .date_uploaded
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default(),
        list_text(&record.show_tags),
        record.show_tags_cleaned.clone(),
        cell(record.energy_min.as_ref()),
        cell(record.energy_max.as_ref()),
        cell(record.bpm_min.as_ref()),
        cell(record.bpm_max.as_ref()),
        cell(record.info_block_1.as_ref()),
        cell(record.info_block_2.as_ref()),
        cell(record.info_block_3.as_ref()),
        cell(record.info_block_4.as_ref()),
        cell(record.artists_list.as_ref()),
        record.show_info_combined.clone(),
        record.show_url.clone(),
    ]
}

fn cell<T: Display>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// Bracketed list text: `['Zouk', 'R&B']`
pub fn list_text(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| {
            if item.contains('\'') && !item.contains('"') {
                format!("\"{}\"", item.replace('\\', "\\\\"))
            } else {
                format!("'{}'", item.replace('\\', "\\\\").replace('\'', "\\'"))
            }
        })
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Inverse of [`list_text`]. Unquoted or malformed text yields what could be read.
pub fn parse_list_text(text: &str) -> Vec<String> {
    let inner = text.trim().trim_start_matches('[').trim_end_matches(']');
    let mut items = Vec::new();
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        let quote = match c {
            '\'' | '"' => c,
            _ => continue,
        };
        let mut item = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        item.push(escaped);
                    }
                }
                c if c == quote => break,
                c => item.push(c),
            }
        }
        items.push(item);
    }
    items
}

/// Read a sets table written by [`sets_csv`]
pub fn load_dataset_csv(path: &Path) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::new(&headers);

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        records.push(columns.record(&row));
        debug!("Loaded row {} from {}", line + 1, path.display());
    }

    info!("📂 Loaded {} set record(s) from {}", records.len(), path.display());
    Ok(Dataset::new(records))
}

/// Header positions; unknown columns are ignored and missing ones read as empty
struct ColumnIndex {
    positions: Vec<Option<usize>>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let positions = COLUMNS
            .iter()
            .map(|column| headers.iter().position(|header| header.trim() == *column))
            .collect::<Vec<_>>();
        for (column, position) in COLUMNS.iter().zip(&positions) {
            if position.is_none() {
                warn!("Column '{}' missing from dataset file", column);
            }
        }
        Self { positions }
    }

    fn get<'r>(&self, row: &'r StringRecord, column: usize) -> Option<&'r str> {
        self.positions[column]
            .and_then(|index| row.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn text(&self, row: &StringRecord, column: usize) -> Option<String> {
        self.get(row, column).map(str::to_string)
    }

    fn number<T: std::str::FromStr>(&self, row: &StringRecord, column: usize) -> Option<T> {
        self.get(row, column).and_then(|value| {
            // Spreadsheet round-trips turn integers into "12.0"
            value
                .parse()
                .ok()
                .or_else(|| value.strip_suffix(".0").and_then(|v| v.parse().ok()))
        })
    }

    fn record(&self, row: &StringRecord) -> NormalizedSetRecord {
        NormalizedSetRecord {
            name: self.text(row, 0).unwrap_or_default(),
            title: self.text(row, 1),
            play_count: self.number(row, 2),
            fav_count: self.number(row, 3),
            date_posted_raw: self.text(row, 4),
            date_uploaded: self
                .get(row, 5)
                .and_then(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).ok()),
            show_tags: self.get(row, 6).map(parse_list_text).unwrap_or_default(),
            show_tags_cleaned: self.text(row, 7).unwrap_or_default(),
            energy_min: self.number(row, 8),
            energy_max: self.number(row, 9),
            bpm_min: self.number(row, 10),
            bpm_max: self.number(row, 11),
            info_block_1: self.text(row, 12),
            info_block_2: self.text(row, 13),
            info_block_3: self.text(row, 14),
            info_block_4: self.text(row, 15),
            artists_list: self.text(row, 16),
            show_info_combined: self.text(row, 17).unwrap_or_default(),
            show_url: self.text(row, 18).unwrap_or_default(),
        }
    }
}
