use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::questionnaire::dto::TargetItem;
use crate::domain::questionnaire::model::{Questionnaire, QuestionnaireSort, ResShareType};
use crate::utils::format_datetime;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// Identity as resolved by the chat service
    pub user_id: String,
}

/// 응답 대상 설문 조회 조건
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TargetedQuery {
    /// 없으면 마감이 가까운 순
    pub sort: Option<QuestionnaireSort>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetedQuestionnaireItem {
    pub questionnaire_id: i64,
    pub title: String,
    pub description: String,
    pub res_time_limit: Option<String>,
    pub res_shared_to: ResShareType,
    /// 가장 최근 제출 시각. 제출한 적 없으면 null
    pub responded_at: Option<String>,
    /// 임시 저장을 포함해 응답이 하나라도 있는지
    pub has_response: bool,
    pub created_at: String,
    pub modified_at: String,
}

impl TargetedQuestionnaireItem {
    pub fn new(
        questionnaire: &Questionnaire,
        responded_at: Option<String>,
        has_response: bool,
    ) -> Self {
        let settings = &questionnaire.settings;
        Self {
            questionnaire_id: questionnaire.id,
            title: settings.title.clone(),
            description: settings.description.clone(),
            res_time_limit: settings.res_time_limit.map(format_datetime),
            res_shared_to: settings.res_shared_to,
            responded_at,
            has_response,
            created_at: format_datetime(questionnaire.created_at),
            modified_at: format_datetime(questionnaire.modified_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdministratedQuestionnaireItem {
    pub questionnaire_id: i64,
    pub title: String,
    pub description: String,
    pub res_time_limit: Option<String>,
    pub res_shared_to: ResShareType,
    pub is_open: bool,
    pub administrators: Vec<String>,
    pub targets: Vec<TargetItem>,
    /// 제출을 마친 응답자 (익명 설문이면 비어 있다)
    pub respondents: Vec<String>,
    /// 그룹을 펼친 모든 대상자가 제출했는지
    pub all_responded: bool,
    pub created_at: String,
    pub modified_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMeResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: MeResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessTargetedListResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<TargetedQuestionnaireItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessAdministratedListResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<AdministratedQuestionnaireItem>,
}
