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

/// 点赞开关接口
///
/// 已点赞则取消，未点赞则创建，响应带最新点赞数。
#[axum::debug_handler]
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> impl IntoResponse {
    match state.engagement.toggle_like(&claims.sub, &post_id).await {
        Ok(outcome) => (StatusCode::OK, success_to_api_response(outcome)),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "帖子不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "点赞操作失败".to_string()),
        ),
    }
}
