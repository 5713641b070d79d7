use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState,
    error::ServiceError,
    utils::{Claims, error_codes, error_to_api_response, generate_token, success_to_api_response},
};

use super::model::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, VerifyEmailResponse,
};

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    // 基本格式检查
    if req.name.len() < 2 || req.name.len() > 64 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "昵称长度必须在2到64个字符之间".to_string(),
            ),
        );
    }
    if !req.email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(error_codes::VALIDATION_ERROR, "邮箱格式无效".to_string()),
        );
    }
    if req.password.len() < 6 || req.password.len() > 64 {
        return (
            StatusCode::BAD_REQUEST,
            error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "密码长度必须在6到64个字符之间".to_string(),
            ),
        );
    }

    match state
        .users
        .register(&req.name, &req.email, &req.password)
        .await
    {
        Ok(registration) => {
            // 邮件投递在部署侧完成，这里只记录发放事件
            tracing::debug!(
                "verification code issued for user {} (reissued: {})",
                registration.user.user_id,
                registration.reissued
            );
            let message = if registration.reissued {
                "新的验证码已发送到你的邮箱".to_string()
            } else {
                "验证码已发送到你的邮箱".to_string()
            };
            (
                StatusCode::CREATED,
                success_to_api_response(RegisterResponse {
                    user_id: registration.user.user_id,
                    message,
                }),
            )
        }
        Err(ServiceError::Conflict) => (
            StatusCode::CONFLICT,
            error_to_api_response(error_codes::ALREADY_EXISTS, "该邮箱已注册".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "注册失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match state.users.authenticate(&req.email, &req.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                error_to_api_response(error_codes::AUTH_FAILED, "邮箱或密码错误".to_string()),
            );
        }
        Err(e) => {
            return (
                e.status_code(),
                error_to_api_response(e.error_code(), "登录失败".to_string()),
            );
        }
    };

    if !user.verified {
        return (
            StatusCode::UNAUTHORIZED,
            error_to_api_response(error_codes::AUTH_FAILED, "邮箱尚未验证".to_string()),
        );
    }

    match generate_token(&user.user_id, &state.config) {
        Ok(token) => (
            StatusCode::OK,
            success_to_api_response(LoginResponse {
                user_id: user.user_id,
                token,
            }),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> impl IntoResponse {
    match state.users.verify_email(&code).await {
        Ok(user) => (
            StatusCode::OK,
            success_to_api_response(VerifyEmailResponse {
                user_id: user.user_id,
                verified: user.verified,
            }),
        ),
        Err(ServiceError::NotFound) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "验证码无效或已使用".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "邮箱验证失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn me(
    Extension(claims): Extension<Claims>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.users.get_by_id(&claims.sub).await {
        Ok(Some(user)) => (StatusCode::OK, success_to_api_response(user)),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            error_to_api_response(error_codes::NOT_FOUND, "用户不存在".to_string()),
        ),
        Err(e) => (
            e.status_code(),
            error_to_api_response(e.error_code(), "获取用户信息失败".to_string()),
        ),
    }
}
