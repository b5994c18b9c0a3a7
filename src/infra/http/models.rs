//! Conversions between domain aggregates and the wire types in `examprep-api-types`.

use examprep_api_types::{
    CategoryChaptersResponse, ChapterCountsResponse, ChapterEntry, CreateQuestionRequest,
    QuestionPageResponse, QuestionSummary, SubjectTopicsEntry, SubjectTopicsResponse, TopicCount,
};
use serde::Deserialize;

use crate::application::admin::CreateQuestionCommand;
use crate::cache::CacheError;
use crate::domain::aggregates::{CategoryChapters, ChapterCounts, QuestionPage, SubjectTopics};
use crate::domain::entities::QuestionRecord;

#[derive(Debug, Default, Deserialize)]
pub struct ChapterCountsParams {
    pub category: Option<String>,
    pub chapter: Option<String>,
}

/// Numeric parameters arrive as text so malformed values share the JSON error shape.
#[derive(Debug, Default, Deserialize)]
pub struct ChapterQuestionsParams {
    pub category: Option<String>,
    pub chapter: Option<String>,
    pub difficulty: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubtopicsParams {
    pub category: Option<String>,
}

pub fn parse_number(name: &'static str, raw: Option<&str>) -> Result<Option<u32>, CacheError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| CacheError::invalid_parameter(name, format!("`{value}` is not a number"))),
    }
}

impl From<ChapterCounts> for ChapterCountsResponse {
    fn from(counts: ChapterCounts) -> Self {
        Self {
            category: counts.category,
            chapter: counts.chapter,
            easy: counts.easy,
            medium: counts.medium,
            hard: counts.hard,
            unrated: counts.unrated,
            total: counts.total,
        }
    }
}

impl From<QuestionRecord> for QuestionSummary {
    fn from(record: QuestionRecord) -> Self {
        Self {
            id: record.id,
            chapter: record.chapter,
            topic: record.topic,
            difficulty: record.difficulty.map(|d| d.as_str().to_string()),
            prompt: record.prompt,
            created_at: record.created_at,
        }
    }
}

impl From<QuestionPage> for QuestionPageResponse {
    fn from(page: QuestionPage) -> Self {
        Self {
            items: page.items.into_iter().map(QuestionSummary::from).collect(),
            page: page.page,
            limit: page.limit,
            total: page.total,
        }
    }
}

impl From<SubjectTopics> for SubjectTopicsResponse {
    fn from(catalogue: SubjectTopics) -> Self {
        Self {
            category: catalogue.category,
            subjects: catalogue
                .subjects
                .into_iter()
                .map(|group| SubjectTopicsEntry {
                    subject: group.subject,
                    topics: group
                        .topics
                        .into_iter()
                        .map(|tally| TopicCount {
                            topic: tally.topic,
                            questions: tally.questions,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl From<CategoryChapters> for CategoryChaptersResponse {
    fn from(listing: CategoryChapters) -> Self {
        Self {
            category: listing.category,
            chapters: listing
                .chapters
                .into_iter()
                .map(|tally| ChapterEntry {
                    chapter: tally.chapter,
                    questions: tally.questions,
                })
                .collect(),
        }
    }
}

impl From<CreateQuestionRequest> for CreateQuestionCommand {
    fn from(request: CreateQuestionRequest) -> Self {
        Self {
            category: request.category,
            subject: request.subject,
            topic: request.topic,
            chapter: request.chapter,
            difficulty: request.difficulty,
            prompt: request.prompt,
            answer: request.answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Difficulty;
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn parse_number_accepts_blank_as_absent() {
        assert_eq!(parse_number("page", None).unwrap(), None);
        assert_eq!(parse_number("page", Some("  ")).unwrap(), None);
        assert_eq!(parse_number("page", Some("3")).unwrap(), Some(3));
    }

    #[test]
    fn parse_number_rejects_garbage() {
        let err = parse_number("limit", Some("ten")).unwrap_err();
        assert!(matches!(err, CacheError::InvalidParameter { .. }));
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn question_summary_renders_difficulty_label() {
        let record = QuestionRecord {
            id: Uuid::nil(),
            category: "gate".into(),
            subject: "CS".into(),
            topic: "Trees".into(),
            chapter: "Graphs".into(),
            chapter_key: "graphs".into(),
            difficulty: Some(Difficulty::Hard),
            prompt: "Prove it".into(),
            created_at: datetime!(2024-05-01 00:00 UTC),
        };

        let summary = QuestionSummary::from(record);
        assert_eq!(summary.difficulty.as_deref(), Some("hard"));
        assert_eq!(summary.chapter, "Graphs");
    }
}
