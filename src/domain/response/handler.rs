use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use validator::Validate;

use super::dto::{
    MyResponseItem, ResponseDetail, SubmitResponseRequest, SuccessMyResponseListResponse,
    SuccessResponseDetailResponse,
};
use super::service::ResponseService;
use crate::state::AppState;
use crate::utils::auth::AuthUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// 응답 제출 API
///
/// 처음이면 응답을 만들고, 이미 살아있는 응답이 있으면 덮어쓴다.
/// 하나라도 검증에 실패하면 아무것도 저장하지 않고 해당 질문 ID와 사유를 돌려준다.
#[utoipa::path(
    post,
    path = "/api/questionnaires/{questionnaire_id}/responses",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    request_body = SubmitResponseRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "응답 저장 성공", body = SuccessResponseDetailResponse),
        (status = 400, description = "답변 검증 실패", body = ErrorResponse),
        (status = 403, description = "마감된 설문", body = ErrorResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse),
        (status = 409, description = "제출된 응답을 임시 저장으로 되돌릴 수 없음", body = ErrorResponse)
    ),
    tag = "Response"
)]
pub async fn submit_response(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
    payload: Result<Json<SubmitResponseRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<ResponseDetail>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = ResponseService::submit(state, user.identity(), questionnaire_id, req).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 내 응답 목록 API
#[utoipa::path(
    get,
    path = "/api/responses/me",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "내 응답 목록", body = SuccessMyResponseListResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "Response"
)]
pub async fn list_my_responses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BaseResponse<Vec<MyResponseItem>>>, AppError> {
    let result = ResponseService::list_mine(state, user.identity()).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 응답 조회 API
#[utoipa::path(
    get,
    path = "/api/responses/{response_id}",
    params(
        ("response_id" = i64, Path, description = "응답 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "응답 상세", body = SuccessResponseDetailResponse),
        (status = 403, description = "본인 또는 관리자가 아님", body = ErrorResponse),
        (status = 404, description = "없거나 철회된 응답", body = ErrorResponse)
    ),
    tag = "Response"
)]
pub async fn get_response(
    State(state): State<AppState>,
    user: AuthUser,
    Path(response_id): Path<i64>,
) -> Result<Json<BaseResponse<ResponseDetail>>, AppError> {
    let result = ResponseService::get(state, user.identity(), response_id).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 응답 철회 API
#[utoipa::path(
    delete,
    path = "/api/responses/{response_id}",
    params(
        ("response_id" = i64, Path, description = "응답 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "응답 철회 성공"),
        (status = 403, description = "본인 또는 관리자가 아님", body = ErrorResponse),
        (status = 404, description = "없는 응답", body = ErrorResponse),
        (status = 409, description = "이미 철회된 응답", body = ErrorResponse)
    ),
    tag = "Response"
)]
pub async fn withdraw_response(
    State(state): State<AppState>,
    user: AuthUser,
    Path(response_id): Path<i64>,
) -> Result<Json<BaseResponse<()>>, AppError> {
    ResponseService::withdraw(state, user.identity(), response_id).await?;

    Ok(Json(BaseResponse::empty()))
}
