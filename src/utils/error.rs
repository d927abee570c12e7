use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use super::response::ErrorResponse;
use crate::domain::chat::ChatError;
use crate::domain::questionnaire::error::QuestionnaireError;
use crate::domain::questionnaire::validation::ValidationReason;
use crate::domain::response::error::ResponseError;
use crate::store::StoreError;

/// 애플리케이션 전역 에러 타입
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    InternalError(String),
    ValidationError(String),
    JsonParseFailed(String),
    /// 답변 검증 실패. 어떤 질문이 왜 거부됐는지 result에 담긴다.
    AnswerRejected {
        question_id: i64,
        reason: ValidationReason,
    },
}

impl AppError {
    /// 에러 메시지 반환
    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::InternalError(msg)
            | AppError::ValidationError(msg) => msg.clone(),
            AppError::JsonParseFailed(msg) => format!("잘못된 요청 형식입니다: {}", msg),
            AppError::AnswerRejected { question_id, reason } => {
                format!("{}번 질문의 답변이 올바르지 않습니다: {}", question_id, reason)
            }
        }
    }

    /// 에러 코드 반환
    pub fn error_code(&self) -> String {
        match self {
            AppError::BadRequest(_) => "COMMON400",
            AppError::NotFound(_) => "COMMON404",
            AppError::Unauthorized(_) => "AUTH401",
            AppError::Forbidden(_) => "COMMON403",
            AppError::Conflict(_) => "COMMON409",
            AppError::InternalError(_) => "COMMON500",
            AppError::ValidationError(_) => "COMMON400",
            AppError::JsonParseFailed(_) => "COMMON400",
            AppError::AnswerRejected { .. } => "RESPONSE400",
        }
        .to_string()
    }

    /// HTTP 상태 코드 반환
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::ValidationError(_)
            | AppError::JsonParseFailed(_)
            | AppError::AnswerRejected { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<serde_json::Value> {
        match self {
            AppError::AnswerRejected { question_id, reason } => Some(json!({
                "questionId": question_id,
                "reason": reason,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.message();

        match &self {
            AppError::InternalError(_) => error!("Internal Server Error: {}", message),
            _ => warn!("Error [{}]: {}", error_code, message),
        }

        let error_response = ErrorResponse::new(error_code, message).with_detail(self.detail());

        (status, Json(error_response)).into_response()
    }
}

/// JsonRejection을 AppError로 변환
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::JsonParseFailed(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(format!("잘못된 조회 조건입니다: {}", rejection.body_text()))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::ValidationError(errors.to_string())
    }
}

impl From<QuestionnaireError> for AppError {
    fn from(err: QuestionnaireError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ResponseError> for AppError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::ValidationFailed {
                question_id,
                reason,
            } => AppError::AnswerRejected {
                question_id,
                reason,
            },
            ResponseError::QuestionnaireClosed => {
                AppError::Forbidden("응답 기간이 지난 설문입니다.".to_string())
            }
            ResponseError::UnknownQuestion(_) => AppError::BadRequest(err.to_string()),
            ResponseError::AlreadyDeleted | ResponseError::AlreadySubmitted => {
                AppError::Conflict(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("존재하지 않는 리소스입니다.".to_string()),
            StoreError::UniqueViolation => {
                AppError::Conflict("이미 제출된 응답이 있습니다.".to_string())
            }
            StoreError::Database(msg) => AppError::InternalError(msg),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Unauthorized => AppError::Unauthorized("인증에 실패했습니다.".to_string()),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// 편의 함수들
impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        AppError::InternalError(msg.into())
    }
}
