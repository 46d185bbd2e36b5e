pub mod admin;

use axum::Json;
use axum::extract::Path;
use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::error::AppError;
use crate::models::Category;
use crate::repository;
use crate::services::{CatalogService, CategoryPage, CourseCard, CourseDetail};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/{id}", get(get_course))
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(category_page))
        .nest("/admin", admin::router())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    repository::list_categories(state.remote.as_ref()).await?;
    Ok(StatusCode::OK)
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseCard>>, AppError> {
    let service = CatalogService::new(state.remote.clone());
    Ok(Json(service.home().await?))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CourseDetail>, AppError> {
    let service = CatalogService::new(state.remote.clone());
    let detail = service.course_detail(&id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(detail))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    let categories = repository::list_categories(state.remote.as_ref()).await?;
    Ok(Json(categories))
}

async fn category_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CategoryPage>, AppError> {
    let service = CatalogService::new(state.remote.clone());
    Ok(Json(service.category_page(Some(id.as_str())).await?))
}
