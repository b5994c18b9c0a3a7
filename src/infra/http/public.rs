use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    response::Response,
    routing::get,
};
use examprep_api_types::{
    CategoryChaptersResponse, ChapterCountsResponse, QuestionPageResponse, SubjectTopicsResponse,
};

use crate::application::{
    queries::{ChapterCountsQuery, ChapterQuestionsQuery, CategoryChaptersQuery, SubtopicsQuery},
    questions::QuestionService,
    repos::StoreHealth,
};

use super::{
    db_health_response,
    error::ApiError,
    middleware::{log_responses, set_request_context},
    models::{ChapterCountsParams, ChapterQuestionsParams, SubtopicsParams, parse_number},
};

#[derive(Clone)]
pub struct HttpState {
    pub questions: Arc<QuestionService>,
    pub health: Arc<dyn StoreHealth>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/questions/chapter/counts", get(chapter_counts))
        .route("/api/questions/chapter", get(chapter_questions))
        .route("/api/topics/allsubtopics", get(all_subtopics))
        .route("/api/categories/{category}/chapters", get(category_chapters))
        .route("/_health/db", get(public_health))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn chapter_counts(
    State(state): State<HttpState>,
    Query(params): Query<ChapterCountsParams>,
) -> Result<Json<ChapterCountsResponse>, ApiError> {
    let query = ChapterCountsQuery::new(params.category.as_deref(), params.chapter.as_deref())?;
    let counts = state.questions.chapter_counts(&query).await?;
    Ok(Json(counts.into()))
}

async fn chapter_questions(
    State(state): State<HttpState>,
    Query(params): Query<ChapterQuestionsParams>,
) -> Result<Json<QuestionPageResponse>, ApiError> {
    let query = ChapterQuestionsQuery::new(
        params.category.as_deref(),
        params.chapter.as_deref(),
        params.difficulty.as_deref(),
        parse_number("page", params.page.as_deref())?,
        parse_number("limit", params.limit.as_deref())?,
    )?;
    let page = state.questions.chapter_questions(&query).await?;
    Ok(Json(page.into()))
}

async fn all_subtopics(
    State(state): State<HttpState>,
    Query(params): Query<SubtopicsParams>,
) -> Result<Json<SubjectTopicsResponse>, ApiError> {
    let query = SubtopicsQuery::new(params.category.as_deref())?;
    let catalogue = state.questions.subtopics(&query).await?;
    Ok(Json(catalogue.into()))
}

async fn category_chapters(
    State(state): State<HttpState>,
    Path(category): Path<String>,
) -> Result<Json<CategoryChaptersResponse>, ApiError> {
    let query = CategoryChaptersQuery::new(Some(category.as_str()))?;
    let listing = state.questions.category_chapters(&query).await?;
    Ok(Json(listing.into()))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.health_check().await)
}
