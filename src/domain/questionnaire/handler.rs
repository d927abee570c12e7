use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use validator::Validate;

use super::dto::{
    QuestionnaireDetail, QuestionnaireListQuery, QuestionnairePage, QuestionnaireRequest,
    SuccessEmptyResponse, SuccessQuestionnaireDetailResponse, SuccessQuestionnairePageResponse,
    SuccessTargetsResponse, TargetsResponse,
};
use super::service::QuestionnaireService;
use crate::domain::response::result::QuestionnaireResult;
use crate::state::AppState;
use crate::utils::auth::AuthUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// 설문 생성 API
///
/// 설문을 만들고 생성자를 관리자로 등록한다. 마감 시각은 미래여야 한다.
#[utoipa::path(
    post,
    path = "/api/questionnaires",
    request_body = QuestionnaireRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "설문 생성 성공", body = SuccessQuestionnaireDetailResponse),
        (status = 400, description = "잘못된 설문 정의", body = ErrorResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn create_questionnaire(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<QuestionnaireRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<QuestionnaireDetail>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result = QuestionnaireService::create(state, user.identity(), req).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 설문 목록 조회 API
///
/// 한 페이지에 20개씩. 정렬, 제목 검색, 응답 대상 제외 조건을 받는다.
#[utoipa::path(
    get,
    path = "/api/questionnaires",
    params(QuestionnaireListQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "설문 목록 한 페이지", body = SuccessQuestionnairePageResponse),
        (status = 400, description = "잘못된 정렬, 검색어 또는 페이지", body = ErrorResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn list_questionnaires(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<QuestionnaireListQuery>, QueryRejection>,
) -> Result<Json<BaseResponse<QuestionnairePage>>, AppError> {
    let Query(query) = query?;
    query.validate()?;

    let result = QuestionnaireService::list(state, user.identity(), query).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 설문 상세 조회 API
#[utoipa::path(
    get,
    path = "/api/questionnaires/{questionnaire_id}",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "설문 상세", body = SuccessQuestionnaireDetailResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn get_questionnaire(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(questionnaire_id): Path<i64>,
) -> Result<Json<BaseResponse<QuestionnaireDetail>>, AppError> {
    let result = QuestionnaireService::get(state, questionnaire_id).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 설문 수정 API
///
/// 설정과 질문 전체를 교체한다. 기존 질문은 소프트 삭제된다.
#[utoipa::path(
    patch,
    path = "/api/questionnaires/{questionnaire_id}",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    request_body = QuestionnaireRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "설문 수정 성공", body = SuccessQuestionnaireDetailResponse),
        (status = 400, description = "잘못된 설문 정의", body = ErrorResponse),
        (status = 403, description = "관리자가 아님", body = ErrorResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn update_questionnaire(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
    payload: Result<Json<QuestionnaireRequest>, JsonRejection>,
) -> Result<Json<BaseResponse<QuestionnaireDetail>>, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let result =
        QuestionnaireService::update(state, user.identity(), questionnaire_id, req).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 설문 삭제 API
#[utoipa::path(
    delete,
    path = "/api/questionnaires/{questionnaire_id}",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "설문 삭제 성공", body = SuccessEmptyResponse),
        (status = 403, description = "관리자가 아님", body = ErrorResponse),
        (status = 404, description = "없거나 이미 삭제된 설문", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn delete_questionnaire(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
) -> Result<Json<BaseResponse<()>>, AppError> {
    QuestionnaireService::delete(state, user.identity(), questionnaire_id).await?;

    Ok(Json(BaseResponse::empty()))
}

/// 설문 결과 조회 API
///
/// 제출 완료된 응답만 집계한다. 결과 공개 범위를 따른다.
#[utoipa::path(
    get,
    path = "/api/questionnaires/{questionnaire_id}/results",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "질문별 집계", body = QuestionnaireResult),
        (status = 403, description = "공개 범위 밖", body = ErrorResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn get_results(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
) -> Result<Json<BaseResponse<QuestionnaireResult>>, AppError> {
    let result = QuestionnaireService::results(state, user.identity(), questionnaire_id).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 응답 대상 확인 API
///
/// 그룹을 멤버로 펼친 대상 목록. 조회에 실패한 그룹은 따로 알려준다.
#[utoipa::path(
    get,
    path = "/api/questionnaires/{questionnaire_id}/targets",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "펼친 대상 목록", body = SuccessTargetsResponse),
        (status = 403, description = "관리자가 아님", body = ErrorResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse)
    ),
    tag = "Questionnaire"
)]
pub async fn get_targets(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
) -> Result<Json<BaseResponse<TargetsResponse>>, AppError> {
    let result = QuestionnaireService::targets(state, user.identity(), questionnaire_id).await?;

    Ok(Json(BaseResponse::success(result)))
}
