#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower::ServiceExt;
use uuid::Uuid;

use examprep::application::admin::{AdminCacheService, AdminQuestionService};
use examprep::application::questions::{
    CATEGORY_CHAPTERS_PROCEDURE, QuestionCaches, QuestionService,
};
use examprep::application::repos::{
    Filter, ProcedureArg, QuestionsWriteRepo, RepoError, Row, RowRange, Selection, StoreHealth,
    TableStore,
};
use examprep::cache::{CacheConfig, CacheTrigger, Clock, ManualClock};
use examprep::domain::entities::{NewQuestion, QuestionRecord};
use examprep::domain::normalize::normalize_name;
use examprep::domain::types::Table;
use examprep::infra::http::{
    ADMIN_TOKEN_HEADER, AdminState, HttpState, build_admin_router, build_router,
};

pub const ADMIN_TOKEN: &str = "letmein";

/// In-memory `questions` table with call counters and failure switches.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Row>>,
    selects: AtomicUsize,
    procedures: AtomicUsize,
    failing: AtomicBool,
    unhealthy: AtomicBool,
    delay_ms: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(
        &self,
        category: &str,
        subject: &str,
        topic: &str,
        chapter: &str,
        difficulty: Option<&str>,
    ) -> Uuid {
        let mut rows = self.rows.lock().expect("rows lock");
        let id = Uuid::new_v4();
        let created_at = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(rows.len() as i64);
        let row = json!({
            "id": id,
            "category": category,
            "subject": subject,
            "topic": topic,
            "chapter": chapter,
            "difficulty": difficulty,
            "prompt": format!("question {}", rows.len()),
            "answer": "answer",
            "created_at": created_at.format(&Rfc3339).expect("format timestamp"),
        });
        rows.push(row.as_object().cloned().expect("object row"));
        id
    }

    pub fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn procedures(&self) -> usize {
        self.procedures.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    async fn pause(&self) {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepoError::Timeout);
        }
        Ok(())
    }

    fn matching(&self, filters: &[Filter]) -> Vec<Row> {
        let rows = self.rows.lock().expect("rows lock");
        rows.iter()
            .filter(|row| filters.iter().all(|filter| matches(row, filter)))
            .cloned()
            .collect()
    }
}

fn text<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).and_then(Value::as_str).unwrap_or_default()
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match filter {
        Filter::EqIgnoreCase { column, value } => {
            text(row, column).trim().to_lowercase() == value.trim().to_lowercase()
        }
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(&self, selection: &Selection, range: RowRange) -> Result<Vec<Row>, RepoError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check()?;
        assert_eq!(selection.table, Table::Questions);

        Ok(self
            .matching(&selection.filters)
            .into_iter()
            .skip(range.offset as usize)
            .take(range.limit as usize)
            .map(|row| {
                selection
                    .columns
                    .iter()
                    .filter_map(|column| {
                        row.get(*column)
                            .map(|value| (column.to_string(), value.clone()))
                    })
                    .collect()
            })
            .collect())
    }

    async fn call_procedure(
        &self,
        name: &str,
        args: &[ProcedureArg],
    ) -> Result<Vec<Row>, RepoError> {
        self.procedures.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.check()?;
        assert_eq!(name, CATEGORY_CHAPTERS_PROCEDURE);

        let category = args
            .iter()
            .find(|arg| arg.name == "p_category")
            .and_then(|arg| arg.value.as_str())
            .unwrap_or_default()
            .to_string();

        let mut tallies: Vec<(String, i64)> = Vec::new();
        for row in self.matching(&[Filter::eq_ignore_case("category", category)]) {
            let chapter = text(&row, "chapter").trim().to_string();
            match tallies.iter_mut().find(|(name, _)| *name == chapter) {
                Some((_, count)) => *count += 1,
                None => tallies.push((chapter, 1)),
            }
        }

        Ok(tallies
            .into_iter()
            .map(|(chapter, questions)| {
                json!({ "chapter": chapter, "questions": questions })
                    .as_object()
                    .cloned()
                    .expect("object row")
            })
            .collect())
    }
}

#[async_trait]
impl QuestionsWriteRepo for MemoryStore {
    async fn insert_question(&self, question: NewQuestion) -> Result<QuestionRecord, RepoError> {
        self.check()?;
        let id = self.seed(
            &question.category,
            &question.subject,
            &question.topic,
            &question.chapter,
            question.difficulty.map(|d| d.as_str()),
        );
        Ok(QuestionRecord {
            id,
            category: question.category,
            subject: question.subject,
            topic: question.topic,
            chapter_key: normalize_name(&question.chapter),
            chapter: question.chapter,
            difficulty: question.difficulty,
            prompt: question.prompt,
            created_at: OffsetDateTime::now_utc(),
        })
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

/// Fully wired routers over a `MemoryStore`, mirroring the production bootstrap.
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub questions: Arc<QuestionService>,
    pub trigger: Arc<CacheTrigger>,
    pub public: Router,
    pub admin: Router,
}

impl TestApp {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    pub fn with_config(store: Arc<MemoryStore>, config: CacheConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0));
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let caches = QuestionCaches::new(&config, shared_clock);
        let trigger = Arc::new(CacheTrigger::default());
        caches.subscribe(&trigger);

        let questions = Arc::new(QuestionService::new(store.clone(), caches, config));
        let health: Arc<dyn StoreHealth> = store.clone();

        let public = build_router(HttpState {
            questions: questions.clone(),
            health: health.clone(),
        });
        let admin = build_admin_router(AdminState {
            questions: Arc::new(AdminQuestionService::new(store.clone(), trigger.clone())),
            cache: Arc::new(AdminCacheService::new(trigger.clone())),
            health,
            token: Some(Arc::from(ADMIN_TOKEN)),
        });

        Self {
            store,
            clock,
            questions,
            trigger,
            public,
            admin,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        send(&self.public, request).await
    }

    pub async fn admin_post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(ADMIN_TOKEN_HEADER, token);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request should build");
        send(&self.admin, request).await
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}
