//! HTTP错误映射

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};
use ward_core::WardError;

/// 包装 `WardError`，转换为JSON错误响应
#[derive(Debug)]
pub struct ApiError(pub WardError);

impl From<WardError> for ApiError {
    fn from(err: WardError) -> Self {
        Self(err)
    }
}

// 提取器拒绝统一按输入校验错误处理
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(WardError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(WardError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(WardError::Validation(rejection.body_text()))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WardError::Validation(_) => StatusCode::BAD_REQUEST,
            WardError::NotFound(_) => StatusCode::NOT_FOUND,
            WardError::Conflict(_) | WardError::InvalidStateTransition { .. } => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), message);
        }

        let body = Json(json!({
            "error": true,
            "message": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(WardError::Validation("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(WardError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(WardError::InvalidStateTransition {
                from: "Done".into(),
                event: "Withdrawn".into()
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(WardError::Database("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
