//! Row schemas as returned by the table store, and their validated forms.
//!
//! Rows arrive as loosely typed JSON objects. Each endpoint decodes them into
//! one of the `*Row` structs immediately after fetch and converts them into a
//! normalized record before any reduction runs.

use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::normalize::normalize_name;
use super::types::Difficulty;

/// Projection of `questions` used for difficulty tallies.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionMetaRow {
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMeta {
    /// Normalized chapter name; empty when the row carries none.
    pub chapter_key: String,
    pub difficulty: Option<Difficulty>,
}

impl From<QuestionMetaRow> for QuestionMeta {
    fn from(row: QuestionMetaRow) -> Self {
        Self {
            chapter_key: row.chapter.as_deref().map(normalize_name).unwrap_or_default(),
            difficulty: row.difficulty.as_deref().and_then(Difficulty::parse),
        }
    }
}

/// Full `questions` row used by the chapter question listing.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRow {
    pub id: Uuid,
    pub category: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    pub prompt: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub id: Uuid,
    pub category: String,
    pub subject: String,
    pub topic: String,
    pub chapter: String,
    pub chapter_key: String,
    pub difficulty: Option<Difficulty>,
    pub prompt: String,
    pub created_at: OffsetDateTime,
}

impl From<QuestionRow> for QuestionRecord {
    fn from(row: QuestionRow) -> Self {
        let chapter = row.chapter.map(|c| c.trim().to_string()).unwrap_or_default();
        Self {
            id: row.id,
            category: row.category,
            subject: row.subject.map(|s| s.trim().to_string()).unwrap_or_default(),
            topic: row.topic.map(|t| t.trim().to_string()).unwrap_or_default(),
            chapter_key: normalize_name(&chapter),
            chapter,
            difficulty: row.difficulty.as_deref().and_then(Difficulty::parse),
            prompt: row.prompt,
            created_at: row.created_at,
        }
    }
}

/// Projection of `questions` used to build the subject → topic catalogue.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectTopicRow {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

/// Output row of the `category_chapter_counts` stored procedure.
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterCountRow {
    pub chapter: Option<String>,
    pub questions: i64,
}

/// Parameters for inserting a question through the admin surface.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub category: String,
    pub subject: String,
    pub topic: String,
    pub chapter: String,
    pub difficulty: Option<Difficulty>,
    pub prompt: String,
    pub answer: String,
}
