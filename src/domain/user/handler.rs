use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};

use super::dto::{
    AdministratedQuestionnaireItem, MeResponse, SuccessAdministratedListResponse,
    SuccessMeResponse, SuccessTargetedListResponse, TargetedQuery, TargetedQuestionnaireItem,
};
use super::service::UserService;
use crate::domain::response::dto::MyResponseItem;
use crate::domain::response::service::ResponseService;
use crate::state::AppState;
use crate::utils::auth::AuthUser;
use crate::utils::error::AppError;
use crate::utils::BaseResponse;

/// 내 정보 조회 API
///
/// Returns the identity the bearer credential resolves to.
#[utoipa::path(
    get,
    path = "/api/users/me",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Resolved identity", body = SuccessMeResponse),
        (status = 401, description = "Credential rejected", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn get_me(user: AuthUser) -> Result<Json<BaseResponse<MeResponse>>, AppError> {
    Ok(Json(BaseResponse::success(MeResponse { user_id: user.0 })))
}

/// 내가 응답 대상인 설문 API
///
/// 마감 전인 설문만, 내 제출 여부와 함께 돌려준다.
#[utoipa::path(
    get,
    path = "/api/users/me/targeted",
    params(TargetedQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "응답 대상 설문 목록", body = SuccessTargetedListResponse),
        (status = 400, description = "잘못된 정렬 기준", body = ErrorResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn list_my_targeted(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<TargetedQuery>, QueryRejection>,
) -> Result<Json<BaseResponse<Vec<TargetedQuestionnaireItem>>>, AppError> {
    let Query(query) = query?;

    let result = UserService::targeted(state, user.identity(), query.sort, false).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 다른 사용자의 미응답 설문 API
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/targeted",
    params(
        ("user_id" = String, Path, description = "사용자 ID"),
        TargetedQuery
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "아직 제출하지 않은 응답 대상 설문", body = SuccessTargetedListResponse),
        (status = 400, description = "잘못된 정렬 기준", body = ErrorResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn list_user_targeted(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<String>,
    query: Result<Query<TargetedQuery>, QueryRejection>,
) -> Result<Json<BaseResponse<Vec<TargetedQuestionnaireItem>>>, AppError> {
    let Query(query) = query?;

    let result = UserService::targeted(state, &user_id, query.sort, true).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 내가 관리하는 설문 API
#[utoipa::path(
    get,
    path = "/api/users/me/administrates",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "최근 수정 순 관리 설문 목록", body = SuccessAdministratedListResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn list_my_administrated(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BaseResponse<Vec<AdministratedQuestionnaireItem>>>, AppError> {
    let result = UserService::administrated(state, user.identity()).await?;

    Ok(Json(BaseResponse::success(result)))
}

/// 특정 설문에 대한 내 응답 API
#[utoipa::path(
    get,
    path = "/api/users/me/responses/{questionnaire_id}",
    params(
        ("questionnaire_id" = i64, Path, description = "설문 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "이 설문에 남긴 내 응답", body = SuccessMyResponseListResponse),
        (status = 401, description = "인증 실패", body = ErrorResponse),
        (status = 404, description = "없거나 삭제된 설문", body = ErrorResponse)
    ),
    tag = "User"
)]
pub async fn list_my_responses_to(
    State(state): State<AppState>,
    user: AuthUser,
    Path(questionnaire_id): Path<i64>,
) -> Result<Json<BaseResponse<Vec<MyResponseItem>>>, AppError> {
    let result = ResponseService::list_mine_for(state, user.identity(), questionnaire_id).await?;

    Ok(Json(BaseResponse::success(result)))
}
