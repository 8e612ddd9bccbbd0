use axum::{extract::{Path, State}, Json};
use common::types::Ack;
use service::users::domain::{CreateUserInput, UserPatch, UserRecord};

use super::ServerState;
use crate::errors::ApiError;

/// 列出全部用户
pub async fn list_users(State(state): State<ServerState>) -> Result<Json<Vec<UserRecord>>, ApiError> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}

/// 获取指定用户
pub async fn get_user(
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<UserRecord>, ApiError> {
    let user = state.users.get_user(&username).await?;
    Ok(Json(user))
}

/// 注册用户；用户名已存在时返回错误
pub async fn create_user(
    State(state): State<ServerState>,
    Json(input): Json<CreateUserInput>,
) -> Result<Json<UserRecord>, ApiError> {
    let user = state.users.create_user(input).await?;
    Ok(Json(user))
}

/// 部分更新：仅覆盖请求体中出现的字段
pub async fn update_user(
    State(state): State<ServerState>,
    Path(username): Path<String>,
    Json(fields): Json<UserPatch>,
) -> Result<Json<Ack>, ApiError> {
    state.users.update_user(&username, fields).await?;
    Ok(Json(Ack::OK))
}

pub async fn delete_user(
    State(state): State<ServerState>,
    Path(username): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    state.users.delete_user(&username).await?;
    Ok(Json(Ack::OK))
}
