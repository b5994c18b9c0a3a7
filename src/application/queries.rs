//! Typed aggregate queries.
//!
//! Each query validates its raw parameters up front, so a malformed request
//! fails before any cache or store access, and derives its cache key and
//! invalidation tags from the normalized values.

use crate::cache::{CacheError, CacheKey, CacheTag, Namespace};
use crate::domain::normalize::{normalize_code, normalize_name};
use crate::domain::types::Difficulty;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

fn required(name: &'static str, value: Option<&str>) -> Result<String, CacheError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(CacheError::invalid_parameter(name, "is required")),
    }
}

// A name made only of separators normalizes to nothing and would never match a row.
fn required_name(name: &'static str, value: Option<&str>) -> Result<String, CacheError> {
    let raw = required(name, value)?;
    if normalize_name(&raw).is_empty() {
        return Err(CacheError::invalid_parameter(name, "is required"));
    }
    Ok(raw)
}

fn category(value: Option<&str>) -> Result<String, CacheError> {
    required("category", value).map(|raw| normalize_code(&raw))
}

/// Difficulty tallies for one chapter of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterCountsQuery {
    pub category: String,
    pub chapter: String,
}

impl ChapterCountsQuery {
    pub fn new(category_raw: Option<&str>, chapter: Option<&str>) -> Result<Self, CacheError> {
        Ok(Self {
            category: category(category_raw)?,
            chapter: required_name("chapter", chapter)?,
        })
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::builder(Namespace::ChapterCounts)
            .code("category", Some(self.category.as_str()))
            .name("chapter", Some(self.chapter.as_str()))
            .build()
    }

    pub fn tags(&self) -> Vec<CacheTag> {
        vec![
            CacheTag::namespace(Namespace::ChapterCounts),
            CacheTag::category(&self.category),
            CacheTag::chapter(&self.category, &self.chapter),
        ]
    }
}

/// One page of a chapter's questions, optionally narrowed to a difficulty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterQuestionsQuery {
    pub category: String,
    pub chapter: String,
    pub difficulty: Option<Difficulty>,
    /// One-based.
    pub page: u32,
    pub limit: u32,
}

impl ChapterQuestionsQuery {
    pub fn new(
        category_raw: Option<&str>,
        chapter: Option<&str>,
        difficulty: Option<&str>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Self, CacheError> {
        let difficulty = match difficulty.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(Difficulty::parse(raw).ok_or_else(|| {
                CacheError::invalid_parameter("difficulty", format!("unknown difficulty `{raw}`"))
            })?),
            None => None,
        };

        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(CacheError::invalid_parameter("page", "must be at least 1"));
        }

        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(CacheError::invalid_parameter(
                "limit",
                format!("must be between 1 and {MAX_PAGE_LIMIT}"),
            ));
        }

        Ok(Self {
            category: category(category_raw)?,
            chapter: required_name("chapter", chapter)?,
            difficulty,
            page,
            limit,
        })
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::builder(Namespace::ChapterQuestions)
            .code("category", Some(self.category.as_str()))
            .name("chapter", Some(self.chapter.as_str()))
            .code("difficulty", self.difficulty.map(Difficulty::as_str))
            .number("page", Some(self.page))
            .number("limit", Some(self.limit))
            .build()
    }

    pub fn tags(&self) -> Vec<CacheTag> {
        vec![
            CacheTag::namespace(Namespace::ChapterQuestions),
            CacheTag::category(&self.category),
            CacheTag::chapter(&self.category, &self.chapter),
        ]
    }
}

/// Subject → topic catalogue of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicsQuery {
    pub category: String,
}

impl SubtopicsQuery {
    pub fn new(category_raw: Option<&str>) -> Result<Self, CacheError> {
        Ok(Self {
            category: category(category_raw)?,
        })
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::builder(Namespace::Subtopics)
            .code("category", Some(self.category.as_str()))
            .build()
    }

    pub fn tags(&self) -> Vec<CacheTag> {
        vec![
            CacheTag::namespace(Namespace::Subtopics),
            CacheTag::category(&self.category),
            CacheTag::catalog(&self.category),
        ]
    }
}

/// Chapters of a category with their question counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChaptersQuery {
    pub category: String,
}

impl CategoryChaptersQuery {
    pub fn new(category_raw: Option<&str>) -> Result<Self, CacheError> {
        Ok(Self {
            category: category(category_raw)?,
        })
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::builder(Namespace::CategoryChapters)
            .code("category", Some(self.category.as_str()))
            .build()
    }

    pub fn tags(&self) -> Vec<CacheTag> {
        vec![
            CacheTag::namespace(Namespace::CategoryChapters),
            CacheTag::category(&self.category),
            CacheTag::catalog(&self.category),
        ]
    }
}
