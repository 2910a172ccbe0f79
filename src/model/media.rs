use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ordered::Id;

/// Kinds of media tracked by the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Book,
    Game,
    Movie,
    Show,
    Anime,
    Manga,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        MediaType::Book,
        MediaType::Game,
        MediaType::Movie,
        MediaType::Show,
        MediaType::Anime,
        MediaType::Manga,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Book => "book",
            MediaType::Game => "game",
            MediaType::Movie => "movie",
            MediaType::Show => "show",
            MediaType::Anime => "anime",
            MediaType::Manga => "manga",
        }
    }

    /// Accepts singular or plural names (`book`, `books`)
    pub fn parse(s: &str) -> Option<MediaType> {
        let s = s.trim().to_lowercase();
        let singular = s.strip_suffix('s').unwrap_or(&s);
        MediaType::ALL
            .into_iter()
            .find(|t| t.as_str() == s || t.as_str() == singular)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Dropped,
}

impl MediaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaStatus::Planned => "planned",
            MediaStatus::InProgress => "in_progress",
            MediaStatus::Completed => "completed",
            MediaStatus::Dropped => "dropped",
        }
    }

    pub fn parse(s: &str) -> Option<MediaStatus> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "" | "planned" | "plan_to_read" | "plan_to_watch" | "backlog" => {
                Some(MediaStatus::Planned)
            }
            "in_progress" | "reading" | "watching" | "playing" => Some(MediaStatus::InProgress),
            "completed" | "done" | "finished" => Some(MediaStatus::Completed),
            "dropped" | "abandoned" => Some(MediaStatus::Dropped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Id,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub status: MediaStatus,
    /// 1..=10
    #[serde(default)]
    pub rating: Option<u8>,
    /// Pages, episodes, chapters or hours, depending on the media type
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewMedia {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MediaStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Result of a CSV import
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub total_rows: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    #[serde(default)]
    pub duplicate_titles: Vec<String>,
}
