use axum::extract::{FromRequestParts, Path, State};
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Category, Course, CourseDraft, NewCategoryRequest};
use crate::repository;
use crate::session::AdminSession;
use crate::state::AppState;

#[derive(Deserialize)]
struct LoginRequest {
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

/// An authenticated admin session, taken from `Authorization: Bearer <session id>`.
pub struct AdminGuard(pub AdminSession);

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session_id = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let session = state.session(session_id).await?;
        session.require_admin()?;
        Ok(AdminGuard(session))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", put(update_course).delete(delete_course))
        .route("/categories", post(create_category))
        .route("/categories/{id}", put(update_category).delete(delete_category))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    state.sessions.prune_expired().await?;

    let token = Uuid::new_v4().to_string();
    let mut session = state.session(&token).await?;

    if !session.login(&req.password).await? {
        return Err(AppError::Unauthorized);
    }
    Ok(Json(LoginResponse { token }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    if let Some(session_id) = bearer_token(&headers) {
        state.session(session_id).await?.logout().await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_courses(
    _admin: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::list_courses(state.remote.as_ref()).await?;
    Ok(Json(courses))
}

async fn create_course(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<CourseDraft>,
) -> Result<Json<Course>, AppError> {
    let course = repository::add_course(state.remote.as_ref(), &req).await?;
    Ok(Json(course))
}

async fn update_course(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CourseDraft>,
) -> Result<Json<Course>, AppError> {
    let course = repository::update_course(state.remote.as_ref(), &id, &req).await?;
    Ok(Json(course))
}

async fn delete_course(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    repository::delete_course(state.remote.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_category(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Json(req): Json<NewCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let category = repository::add_category(state.remote.as_ref(), &req.name).await?;
    Ok(Json(category))
}

async fn update_category(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    let category = repository::update_category(state.remote.as_ref(), &id, &req.name).await?;
    Ok(Json(category))
}

async fn delete_category(
    _admin: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = repository::delete_category(state.remote.as_ref(), &id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Conflict(
            "Category is still used by at least one course".to_string(),
        ))
    }
}
