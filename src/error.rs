use axum::http::StatusCode;
use thiserror::Error;

use crate::utils::error_codes;

/// 服务层错误分类
///
/// 核心服务只返回这里定义的错误，HTTP 语义在路由层映射。
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 实体不存在
    #[error("resource not found")]
    NotFound,

    /// 不能关注自己
    #[error("users cannot follow themselves")]
    SelfFollow,

    /// 唯一约束冲突
    #[error("duplicate record violates unique constraint")]
    Conflict,

    /// 缓存或队列不可用
    ///
    /// 读路径把该错误降级为缓存未命中，写路径允许副作用延迟，
    /// 只有主存储不可用才导致请求失败。
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// 主存储错误，原样向调用方传播
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// 路由层使用的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::SelfFollow => StatusCode::BAD_REQUEST,
            ServiceError::Conflict => StatusCode::CONFLICT,
            ServiceError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 业务错误码
    pub fn error_code(&self) -> i32 {
        match self {
            ServiceError::NotFound => error_codes::NOT_FOUND,
            ServiceError::SelfFollow => error_codes::VALIDATION_ERROR,
            ServiceError::Conflict => error_codes::ALREADY_EXISTS,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_mapping() {
        assert_eq!(ServiceError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::SelfFollow.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::UpstreamUnavailable("redis timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
