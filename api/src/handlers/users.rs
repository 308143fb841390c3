//! User handlers
//!
//! CRUD endpoints backed by the registered `UserService`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::domain::entities::{NewUser, Page, User, UserId, UserPage, UserUpdate};
use crate::error::AppError;
use crate::AppState;

/// Query parameters for listing users
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn user_id(id: i64) -> Result<UserId, AppError> {
    if id <= 0 {
        return Err(AppError::BadRequest(format!("Invalid user id: {}", id)));
    }
    Ok(UserId(id))
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<UserPage>, AppError> {
    let page = Page::new(query.limit, query.offset)?;
    Ok(Json(state.user_service.list(page).await?))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.user_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.user_service.get(user_id(id)?).await?))
}

/// PATCH /users/:id
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.user_service.update(user_id(id)?, request).await?))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.user_service.delete(user_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
