//! Read-side question aggregates served through the read-through caches.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cache::{CacheConfig, CacheError, CacheTrigger, Clock, ReadThroughCache};
use crate::domain::aggregates::{CategoryChapters, ChapterCounts, QuestionPage, SubjectTopics};
use crate::domain::entities::{
    ChapterCountRow, QuestionMeta, QuestionMetaRow, QuestionRecord, QuestionRow, SubjectTopicRow,
};
use crate::domain::types::Table;

use super::aggregate::{
    collect_pages, decode_rows, reduce_category_chapters, reduce_chapter_counts,
    reduce_question_page, reduce_subject_topics,
};
use super::queries::{
    CategoryChaptersQuery, ChapterCountsQuery, ChapterQuestionsQuery, SubtopicsQuery,
};
use super::repos::{Filter, ProcedureArg, Selection, TableStore};

pub const CATEGORY_CHAPTERS_PROCEDURE: &str = "category_chapter_counts";

const META_COLUMNS: &[&str] = &["chapter", "difficulty"];
const QUESTION_COLUMNS: &[&str] = &[
    "id",
    "category",
    "subject",
    "topic",
    "chapter",
    "difficulty",
    "prompt",
    "created_at",
];
const SUBJECT_TOPIC_COLUMNS: &[&str] = &["subject", "topic"];
const SCAN_ORDER: &[&str] = &["created_at", "id"];

/// One read-through cache per aggregate family.
#[derive(Clone)]
pub struct QuestionCaches {
    pub chapter_counts: ReadThroughCache<ChapterCounts>,
    pub chapter_questions: ReadThroughCache<QuestionPage>,
    pub subtopics: ReadThroughCache<SubjectTopics>,
    pub category_chapters: ReadThroughCache<CategoryChapters>,
}

impl QuestionCaches {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            chapter_counts: ReadThroughCache::new("chapter_counts", config, clock.clone()),
            chapter_questions: ReadThroughCache::new("chapter_questions", config, clock.clone()),
            subtopics: ReadThroughCache::new("subtopics", config, clock.clone()),
            category_chapters: ReadThroughCache::new("category_chapters", config, clock),
        }
    }

    /// Route every invalidation published on `trigger` to these caches.
    pub fn subscribe(&self, trigger: &CacheTrigger) {
        trigger.subscribe(Arc::new(self.chapter_counts.clone()));
        trigger.subscribe(Arc::new(self.chapter_questions.clone()));
        trigger.subscribe(Arc::new(self.subtopics.clone()));
        trigger.subscribe(Arc::new(self.category_chapters.clone()));
    }
}

#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn TableStore>,
    caches: QuestionCaches,
    config: CacheConfig,
}

impl QuestionService {
    pub fn new(store: Arc<dyn TableStore>, caches: QuestionCaches, config: CacheConfig) -> Self {
        Self {
            store,
            caches,
            config,
        }
    }

    pub fn caches(&self) -> &QuestionCaches {
        &self.caches
    }

    pub async fn chapter_counts(
        &self,
        query: &ChapterCountsQuery,
    ) -> Result<ChapterCounts, CacheError> {
        let store = Arc::clone(&self.store);
        let page_size = self.config.page_size();
        let selection = category_scan(META_COLUMNS, &query.category);
        let owned = query.clone();

        self.caches
            .chapter_counts
            .get_or_compute(
                query.key(),
                self.config.chapter_counts_ttl(),
                &query.tags(),
                move || async move {
                    let rows: Vec<QuestionMetaRow> =
                        scan(store.as_ref(), &selection, page_size, "question meta").await?;
                    Ok(reduce_chapter_counts(
                        &owned.category,
                        &owned.chapter,
                        rows.into_iter().map(QuestionMeta::from),
                    ))
                },
            )
            .await
    }

    pub async fn chapter_questions(
        &self,
        query: &ChapterQuestionsQuery,
    ) -> Result<QuestionPage, CacheError> {
        let store = Arc::clone(&self.store);
        let page_size = self.config.page_size();
        let selection = category_scan(QUESTION_COLUMNS, &query.category);
        let owned = query.clone();

        self.caches
            .chapter_questions
            .get_or_compute(
                query.key(),
                self.config.chapter_questions_ttl(),
                &query.tags(),
                move || async move {
                    let rows: Vec<QuestionRow> =
                        scan(store.as_ref(), &selection, page_size, "question").await?;
                    Ok(reduce_question_page(
                        rows.into_iter().map(QuestionRecord::from),
                        &owned.chapter,
                        owned.difficulty,
                        owned.page,
                        owned.limit,
                    ))
                },
            )
            .await
    }

    pub async fn subtopics(&self, query: &SubtopicsQuery) -> Result<SubjectTopics, CacheError> {
        let store = Arc::clone(&self.store);
        let page_size = self.config.page_size();
        let selection = category_scan(SUBJECT_TOPIC_COLUMNS, &query.category);
        let category = query.category.clone();

        self.caches
            .subtopics
            .get_or_compute(
                query.key(),
                self.config.subtopics_ttl(),
                &query.tags(),
                move || async move {
                    let rows: Vec<SubjectTopicRow> =
                        scan(store.as_ref(), &selection, page_size, "subject topic").await?;
                    Ok(reduce_subject_topics(&category, rows))
                },
            )
            .await
    }

    pub async fn category_chapters(
        &self,
        query: &CategoryChaptersQuery,
    ) -> Result<CategoryChapters, CacheError> {
        let store = Arc::clone(&self.store);
        let category = query.category.clone();

        self.caches
            .category_chapters
            .get_or_compute(
                query.key(),
                self.config.chapters_ttl(),
                &query.tags(),
                move || async move {
                    let args = [ProcedureArg::new("p_category", category.as_str())];
                    let rows = store
                        .call_procedure(CATEGORY_CHAPTERS_PROCEDURE, &args)
                        .await?;
                    let rows: Vec<ChapterCountRow> = decode_rows(rows, "chapter count")?;
                    Ok(reduce_category_chapters(&category, rows))
                },
            )
            .await
    }
}

fn category_scan(columns: &'static [&'static str], category: &str) -> Selection {
    Selection {
        table: Table::Questions,
        columns,
        filters: vec![Filter::eq_ignore_case("category", category)],
        order_by: SCAN_ORDER,
    }
}

async fn scan<T>(
    store: &dyn TableStore,
    selection: &Selection,
    page_size: usize,
    what: &'static str,
) -> Result<Vec<T>, CacheError>
where
    T: DeserializeOwned + Send,
{
    let rows = collect_pages(page_size, move |range| store.select(selection, range)).await?;
    decode_rows(rows, what)
}
