use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    store::PostChanges,
    utils::{Claims, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{CreatePostRequest, PageQuery, UpdatePostRequest};

#[axum::debug_handler]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    match state.posts.list_page(query.page(), query.limit()).await {
        Ok(posts) => (StatusCode::OK, success_to_api_response(posts)),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取帖子列表失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> impl IntoResponse {
    match state.posts.get_detail(&post_id).await {
        Ok(Some(detail)) => (StatusCode::OK, success_to_api_response(detail)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "帖子不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取帖子失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    if req.title.trim().is_empty() || req.title.len() > 200 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "标题不能为空且不超过200个字符".to_string(),
            ),
        );
    }
    if req.content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, "内容不能为空".to_string()),
        );
    }

    // 作者必须存在
    match state.users.get_by_id(&claims.sub).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "用户不存在".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "创建帖子失败".to_string()),
            );
        }
    }

    match state
        .posts
        .create(&claims.sub, req.title, req.content, req.image)
        .await
    {
        Ok(created) => (StatusCode::CREATED, success_to_api_response(created)),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "创建帖子失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> impl IntoResponse {
    // 归属检查在请求层做，核心服务不感知调用者身份
    let post = match state.posts.get_raw(&post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "帖子不存在".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "更新帖子失败".to_string()),
            );
        }
    };
    if post.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "无权修改该帖子".to_string(),
            ),
        );
    }

    let changes = PostChanges {
        title: req.title,
        content: req.content,
        image: req.image,
    };
    match state.posts.update(&post_id, changes).await {
        Ok(updated) => (StatusCode::OK, success_to_api_response(updated)),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "更新帖子失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> impl IntoResponse {
    let post = match state.posts.get_raw(&post_id).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                error_to_api_response(error_codes::NOT_FOUND, "帖子不存在".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "删除帖子失败".to_string()),
            );
        }
    };
    if post.user_id != claims.sub {
        return (
            StatusCode::FORBIDDEN,
            error_to_api_response(
                error_codes::PERMISSION_DENIED,
                "无权删除该帖子".to_string(),
            ),
        );
    }

    match state.posts.delete(&post_id).await {
        Ok(()) => (
            StatusCode::OK,
            success_to_api_response(serde_json::json!({
                "success": true
            })),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "删除帖子失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn my_posts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    match state
        .posts
        .by_author(&claims.sub, query.page(), query.limit())
        .await
    {
        Ok(posts) => (StatusCode::OK, success_to_api_response(posts)),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取我的帖子失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    match state
        .feeds
        .get_feed(&claims.sub, query.page(), query.limit())
        .await
    {
        Ok(page) => (StatusCode::OK, success_to_api_response(page)),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取feed失败".to_string()),
        ),
    }
}
