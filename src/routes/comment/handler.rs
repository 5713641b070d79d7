use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::ServiceError,
    utils::{Claims, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::CreateCommentRequest;

#[axum::debug_handler]
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    if req.text.trim().is_empty() || req.text.len() > 1000 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "评论不能为空且不超过1000个字符".to_string(),
            ),
        );
    }

    match state
        .engagement
        .create_comment(&claims.sub, &req.post_id, req.text)
        .await
    {
        Ok(comment) => (StatusCode::CREATED, success_to_api_response(comment)),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "帖子不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "发表评论失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<String>,
) -> impl IntoResponse {
    // 只有评论作者能删除
    let comment = match state.engagement.find_comment(&comment_id).await {
        Ok(Some(comment)) => comment,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "评论不存在".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "删除评论失败".to_string()),
            );
        }
    };
    if comment.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "无权删除该评论".to_string(),
            ),
        );
    }

    match state.engagement.delete_comment(&comment_id).await {
        Ok(_) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "success": true
            })),
        ),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "评论不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "删除评论失败".to_string()),
        ),
    }
}
