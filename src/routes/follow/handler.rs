use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::ServiceError,
    utils::{Claims, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{FollowStatusResponse, FollowersResponse, FollowingResponse};

#[axum::debug_handler]
pub async fn follow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    // 被关注的用户必须存在
    match state.users.get_by_id(&user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "要关注的用户不存在".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "关注失败".to_string()),
            );
        }
    }

    match state.follows.follow(&claims.sub, &user_id).await {
        Ok(edge) => (StatusCode::OK, success_to_api_response(edge)),
        Err(ServiceError::SelfFollow) => (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, "不能关注自己".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "关注失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.follows.unfollow(&claims.sub, &user_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "success": true
            })),
        ),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "关注关系不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "取消关注失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.follows.followers_of(&user_id).await {
        Ok(followers) => (
            StatusCode::OK,
            success_to_api_response(FollowersResponse { followers }),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取粉丝列表失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.follows.following_of(&user_id).await {
        Ok(following) => (
            StatusCode::OK,
            success_to_api_response(FollowingResponse { following }),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取关注列表失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn follow_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.follows.is_following(&claims.sub, &user_id).await {
        Ok(is_following) => (
            StatusCode::OK,
            success_to_api_response(FollowStatusResponse { is_following }),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "查询关注状态失败".to_string()),
        ),
    }
}
