//! Full-scan aggregation over paged table reads.
//!
//! Aggregates are always rebuilt from every matching row; nothing here
//! updates a previous result in place.

use std::collections::BTreeMap;
use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cache::CacheError;
use crate::domain::aggregates::{
    CategoryChapters, ChapterCounts, ChapterTally, QuestionPage, SubjectGroup, SubjectTopics,
    TopicTally,
};
use crate::domain::entities::{ChapterCountRow, QuestionMeta, QuestionRecord, SubjectTopicRow};
use crate::domain::normalize::{normalize_code, normalize_name};
use crate::domain::types::Difficulty;

use super::repos::{RepoError, Row, RowRange};

/// Fetch consecutive pages until one comes back short or empty.
///
/// A failure on any page aborts the whole aggregation; rows gathered so far
/// are discarded rather than reduced into a partial result.
pub async fn collect_pages<T, F, Fut>(
    page_size: usize,
    mut fetch_page: F,
) -> Result<Vec<T>, CacheError>
where
    F: FnMut(RowRange) -> Fut,
    Fut: Future<Output = Result<Vec<T>, RepoError>>,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0_u64;

    loop {
        let page = fetch_page(RowRange::new(offset, page_size as u64))
            .await
            .map_err(|err| CacheError::upstream(format!("page at offset {offset}: {err}")))?;
        let fetched = page.len();
        rows.extend(page);
        if fetched < page_size {
            break;
        }
        offset += fetched as u64;
    }

    Ok(rows)
}

/// Decode raw rows into `T`, failing on the first malformed row.
pub fn decode_rows<T: DeserializeOwned>(
    rows: Vec<Row>,
    what: &'static str,
) -> Result<Vec<T>, CacheError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|err| CacheError::upstream(format!("malformed {what} row: {err}")))
        })
        .collect()
}

/// Tally difficulties of the rows belonging to `chapter`.
///
/// Rows from other chapters are skipped; rows without a recognised
/// difficulty count as unrated.
pub fn reduce_chapter_counts<I>(category: &str, chapter: &str, rows: I) -> ChapterCounts
where
    I: IntoIterator<Item = QuestionMeta>,
{
    let chapter_key = normalize_name(chapter);
    let mut counts = ChapterCounts::new(normalize_code(category), chapter.trim());
    for meta in rows.into_iter().filter(|meta| meta.chapter_key == chapter_key) {
        counts.record(meta.difficulty);
    }
    counts
}

/// Group rows into subjects and topics by normalized name.
///
/// The first spelling seen for a name is the one displayed. Rows missing
/// either field are skipped.
pub fn reduce_subject_topics<I>(category: &str, rows: I) -> SubjectTopics
where
    I: IntoIterator<Item = SubjectTopicRow>,
{
    let mut subjects: BTreeMap<String, (String, BTreeMap<String, TopicTally>)> = BTreeMap::new();

    for row in rows {
        let (Some(subject), Some(topic)) = (row.subject, row.topic) else {
            continue;
        };
        let (subject_key, topic_key) = (normalize_name(&subject), normalize_name(&topic));
        if subject_key.is_empty() || topic_key.is_empty() {
            continue;
        }

        let (_, topics) = subjects
            .entry(subject_key)
            .or_insert_with(|| (subject.trim().to_string(), BTreeMap::new()));
        topics
            .entry(topic_key)
            .or_insert_with(|| TopicTally {
                topic: topic.trim().to_string(),
                questions: 0,
            })
            .questions += 1;
    }

    SubjectTopics {
        category: normalize_code(category),
        subjects: subjects
            .into_values()
            .map(|(subject, topics)| SubjectGroup {
                subject,
                topics: topics.into_values().collect(),
            })
            .collect(),
    }
}

/// Select one page of the questions in `chapter`, optionally narrowed to a
/// difficulty. `page` is one-based.
pub fn reduce_question_page<I>(
    records: I,
    chapter: &str,
    difficulty: Option<Difficulty>,
    page: u32,
    limit: u32,
) -> QuestionPage
where
    I: IntoIterator<Item = QuestionRecord>,
{
    let chapter_key = normalize_name(chapter);
    let matching: Vec<QuestionRecord> = records
        .into_iter()
        .filter(|record| record.chapter_key == chapter_key)
        .filter(|record| difficulty.is_none() || record.difficulty == difficulty)
        .collect();

    let total = matching.len() as u64;
    let skip = (page.max(1) as usize - 1).saturating_mul(limit as usize);
    let items = matching.into_iter().skip(skip).take(limit as usize).collect();

    QuestionPage {
        items,
        page,
        limit,
        total,
    }
}

/// Merge procedure rows whose chapter names differ only cosmetically.
pub fn reduce_category_chapters<I>(category: &str, rows: I) -> CategoryChapters
where
    I: IntoIterator<Item = ChapterCountRow>,
{
    let mut chapters: BTreeMap<String, ChapterTally> = BTreeMap::new();

    for row in rows {
        let Some(chapter) = row.chapter else {
            continue;
        };
        let key = normalize_name(&chapter);
        if key.is_empty() {
            continue;
        }
        chapters
            .entry(key)
            .or_insert_with(|| ChapterTally {
                chapter: chapter.trim().to_string(),
                questions: 0,
            })
            .questions += u64::try_from(row.questions).unwrap_or(0);
    }

    CategoryChapters {
        category: normalize_code(category),
        chapters: chapters.into_values().collect(),
    }
}
