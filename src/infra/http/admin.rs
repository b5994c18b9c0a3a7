use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
};
use examprep_api_types::{
    ClearCacheResponse, CreateQuestionRequest, CreateQuestionResponse, RevalidateRequest,
    RevalidateResponse,
};

use crate::application::{
    admin::{AdminCacheService, AdminQuestionService},
    repos::StoreHealth,
};

use super::{
    db_health_response,
    error::ApiError,
    middleware::{log_responses, require_admin_token, set_request_context},
};

#[derive(Clone)]
pub struct AdminState {
    pub questions: Arc<AdminQuestionService>,
    pub cache: Arc<AdminCacheService>,
    pub health: Arc<dyn StoreHealth>,
    pub token: Option<Arc<str>>,
}

pub fn build_admin_router(state: AdminState) -> Router {
    let guarded = Router::new()
        .route("/admin/questions", post(create_question))
        .route("/admin/cache/revalidate", post(revalidate_cache))
        .route("/admin/cache/clear", post(clear_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    Router::new()
        .merge(guarded)
        .route("/_health/db", get(admin_health))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

async fn create_question(
    State(state): State<AdminState>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateQuestionResponse>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
    })?;

    let created = state.questions.create(request.into()).await?;
    let response = CreateQuestionResponse {
        id: created.record.id,
        revalidated: created
            .revalidated
            .iter()
            .map(|tag| tag.as_str().to_string())
            .collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn revalidate_cache(
    State(state): State<AdminState>,
    payload: Result<Json<RevalidateRequest>, JsonRejection>,
) -> Result<Json<RevalidateResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::bad_request("Invalid request body", Some(rejection.body_text()))
    })?;

    let (tag, invalidated) = state.cache.revalidate(&request.tag)?;
    Ok(Json(RevalidateResponse {
        tag: tag.as_str().to_string(),
        invalidated,
    }))
}

async fn clear_cache(State(state): State<AdminState>) -> Json<ClearCacheResponse> {
    Json(ClearCacheResponse {
        cleared: state.cache.clear(),
    })
}

async fn admin_health(State(state): State<AdminState>) -> Response {
    db_health_response(state.health.health_check().await)
}
