//! Download service response models

use serde::{Deserialize, Deserializer};

/// Artist field, which the service sends either as one string or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Artists {
    One(String),
    Many(Vec<String>),
}

impl Artists {
    /// All names joined with ", "
    pub fn joined(&self) -> String {
        match self {
            Artists::One(name) => name.clone(),
            Artists::Many(names) => names.join(", "),
        }
    }
}

/// One track as listed by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEntry {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<Artists>,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
}

/// Response of `/metadata/{album|playlist}/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default)]
    pub success: bool,
    pub title: Option<String>,
    pub artists: Option<Artists>,
    pub cover: Option<String>,
    pub message: Option<String>,
    pub status_code: Option<u16>,
}

/// Response of `/metadata/track/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackMetadata {
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub track: TrackEntry,
    pub message: Option<String>,
    pub status_code: Option<u16>,
}

/// One page of `/trackList/{album|playlist}/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackListPage {
    pub track_list: Option<Vec<TrackEntry>>,
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub next_offset: Option<String>,
}

/// Response of `/download/{id}?token=...`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    #[serde(default)]
    pub success: bool,
    pub link: Option<String>,
    pub message: Option<String>,
    pub status_code: Option<u16>,
}

/// Accept `nextOffset` as a string or a number; empty, zero and null mean no
/// further page.
fn deserialize_offset<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() && s.trim() != "0" => {
            Some(s.trim().to_string())
        }
        Some(serde_json::Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}
