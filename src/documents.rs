/// Text documents for the downstream indexing step
///
/// Each joined row becomes one plain-text document in a fixed `key: value,`
/// template plus a flat JSON metadata object. Missing values render as `None`.
use crate::normalize::{Dataset, JoinedRow};
use crate::parser::ProfileRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Display;

/// One indexable document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetDocument {
    pub content: String,
    pub metadata: Value,
}

/// Render the text template for one joined row
pub fn render_document(row: &JoinedRow) -> String {
    let profile = &row.profile;
    let set = &row.set;

    let fields: [(&str, String); 16] = [
        ("dj_name", profile.name.clone()),
        ("dj_bio", or_none(profile.bio.as_ref())),
        ("df_followers", or_none(profile.followers.as_ref())),
        ("df_following", or_none(profile.following.as_ref())),
        ("title", or_none(set.title.as_ref())),
        ("play_count", or_none(set.play_count.as_ref())),
        ("favorited_count", or_none(set.fav_count.as_ref())),
        ("date_uploaded", or_none(set.date_uploaded.as_ref())),
        ("genre_tags", set.show_tags_cleaned.clone()),
        ("energy_min", or_none(set.energy_min.as_ref())),
        ("energy_max", or_none(set.energy_max.as_ref())),
        ("bpm_min", or_none(set.bpm_min.as_ref())),
        ("bpm_max", or_none(set.bpm_max.as_ref())),
        ("artists_list", or_none(set.artists_list.as_ref())),
        ("show_info_combined", set.show_info_combined.clone()),
        ("show_url", set.show_url.clone()),
    ];

    fields
        .iter()
        .map(|(key, value)| format!("{}: {},\n", key, value))
        .collect()
}

fn or_none<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "None".to_string(), ToString::to_string)
}

/// Metadata stored next to the embedded text
pub fn document_metadata(row: &JoinedRow) -> Value {
    let set = &row.set;
    json!({
        "dj_name": row.profile.name,
        "dj_info": row.profile.bio,
        "dj_followers": row.profile.followers,
        "dj_following": row.profile.following,
        "title": set.title,
        "play_count": set.play_count,
        "fav_count": set.fav_count,
        "date_posted_raw": set.date_posted_raw,
        "date_uploaded": set.date_uploaded.map(|d| d.to_string()),
        "show_tags_cleaned": set.show_tags_cleaned,
        "energy_min": set.energy_min,
        "energy_max": set.energy_max,
        "bpm_min": set.bpm_min,
        "bpm_max": set.bpm_max,
        "artists_list": set.artists_list,
        "show_info_combined": set.show_info_combined,
        "show_url": set.show_url,
    })
}

/// Join `dataset` to `profiles` and render one document per matching row
pub fn build_documents(dataset: &Dataset, profiles: &[ProfileRecord]) -> Vec<SetDocument> {
    dataset
        .join_profiles(profiles)
        .iter()
        .map(|row| SetDocument {
            content: render_document(row),
            metadata: document_metadata(row),
        })
        .collect()
}
