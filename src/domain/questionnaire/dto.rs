use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::entity::target::TargetKind;
use super::model::{
    Question, QuestionOption, QuestionSpec, QuestionType, Questionnaire, QuestionnaireSettings,
    QuestionnaireSort, QuestionnaireSpec, ResShareType, ResubmissionPolicy, ScaleLabel, Target,
    ValidationRule,
};
use super::target::TargetExpansion;
use crate::utils::format_datetime;

// ============== 설문 생성/수정 요청 ==============

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetItem {
    pub kind: TargetKind,
    /// 사용자 ID 또는 그룹 ID
    #[validate(length(min = 1, max = 64, message = "대상 ID는 1~64자여야 합니다."))]
    pub id: String,
}

impl From<TargetItem> for Target {
    fn from(item: TargetItem) -> Self {
        match item.kind {
            TargetKind::User => Target::User(item.id),
            TargetKind::Group => Target::Group(item.id),
        }
    }
}

impl From<&Target> for TargetItem {
    fn from(target: &Target) -> Self {
        match target {
            Target::User(id) => TargetItem {
                kind: TargetKind::User,
                id: id.clone(),
            },
            Target::Group(id) => TargetItem {
                kind: TargetKind::Group,
                id: id.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    #[validate(range(min = 1, message = "pageNum은 1 이상이어야 합니다."))]
    pub page_num: i32,
    #[validate(range(min = 1, message = "questionNum은 1 이상이어야 합니다."))]
    pub question_num: i32,
    pub question_type: QuestionType,
    #[validate(length(min = 1, message = "질문 내용은 비어 있을 수 없습니다."))]
    pub body: String,
    #[serde(default)]
    pub is_required: bool,
    /// 선택지 내용. 주어진 순서대로 1번부터 번호가 매겨진다.
    #[serde(default)]
    pub options: Vec<String>,
    pub scale_label: Option<ScaleLabel>,
    pub validation: Option<ValidationRule>,
}

impl From<QuestionItem> for QuestionSpec {
    fn from(item: QuestionItem) -> Self {
        QuestionSpec {
            options: QuestionOption::numbered(item.options),
            scale_label: item.scale_label,
            validation: item.validation,
            ..QuestionSpec::new(
                item.page_num,
                item.question_num,
                item.question_type,
                item.body,
                item.is_required,
            )
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireRequest {
    #[validate(length(min = 1, max = 50, message = "설문 제목은 1~50자여야 합니다."))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "설문 설명은 2000자를 초과할 수 없습니다."))]
    pub description: String,

    /// 응답 마감 시각 (없으면 무기한)
    #[schema(value_type = Option<String>, example = "2026-12-31T23:59:00")]
    pub res_time_limit: Option<NaiveDateTime>,

    pub res_shared_to: ResShareType,

    #[serde(default)]
    pub is_anonymous: bool,

    #[serde(default)]
    pub allow_multiple_responses: bool,

    #[serde(default)]
    pub resubmission_policy: ResubmissionPolicy,

    /// 생성자는 자동으로 관리자에 포함된다
    #[serde(default)]
    pub administrators: Vec<String>,

    #[serde(default)]
    #[validate(nested)]
    pub targets: Vec<TargetItem>,

    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuestionItem>,
}

impl QuestionnaireRequest {
    /// `caller` is added to the administrators when missing
    pub fn into_spec(self, caller: &str) -> QuestionnaireSpec {
        let mut administrators: Vec<String> = Vec::new();
        for admin in self.administrators {
            if !administrators.contains(&admin) {
                administrators.push(admin);
            }
        }
        if !administrators.iter().any(|a| a == caller) {
            administrators.push(caller.to_string());
        }

        QuestionnaireSpec {
            settings: QuestionnaireSettings {
                title: self.title,
                description: self.description,
                res_time_limit: self.res_time_limit,
                res_shared_to: self.res_shared_to,
                is_anonymous: self.is_anonymous,
                allow_multiple_responses: self.allow_multiple_responses,
                resubmission_policy: self.resubmission_policy,
                administrators,
                targets: self.targets.into_iter().map(Target::from).collect(),
            },
            questions: self.questions.into_iter().map(QuestionSpec::from).collect(),
        }
    }
}

// ============== 설문 조회 응답 ==============

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionItem {
    pub option_num: i32,
    pub body: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDetail {
    pub question_id: i64,
    pub page_num: i32,
    pub question_num: i32,
    pub question_type: QuestionType,
    pub body: String,
    pub is_required: bool,
    pub options: Vec<OptionItem>,
    pub scale_label: Option<ScaleLabel>,
    pub validation: Option<ValidationRule>,
}

impl From<&Question> for QuestionDetail {
    fn from(question: &Question) -> Self {
        Self {
            question_id: question.id,
            page_num: question.page_num,
            question_num: question.question_num,
            question_type: question.question_type(),
            body: question.body.clone(),
            is_required: question.is_required,
            options: question
                .options()
                .iter()
                .map(|o| OptionItem {
                    option_num: o.option_num,
                    body: o.body.clone(),
                })
                .collect(),
            scale_label: question.scale_label().cloned(),
            validation: question.validation_rule().cloned(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireDetail {
    pub questionnaire_id: i64,
    pub title: String,
    pub description: String,
    pub res_time_limit: Option<String>,
    pub res_shared_to: ResShareType,
    pub is_anonymous: bool,
    pub allow_multiple_responses: bool,
    pub resubmission_policy: ResubmissionPolicy,
    pub administrators: Vec<String>,
    pub targets: Vec<TargetItem>,
    pub questions: Vec<QuestionDetail>,
    pub is_open: bool,
    pub created_at: String,
    pub modified_at: String,
}

impl QuestionnaireDetail {
    pub fn new(questionnaire: &Questionnaire, now: NaiveDateTime) -> Self {
        let settings = &questionnaire.settings;
        Self {
            questionnaire_id: questionnaire.id,
            title: settings.title.clone(),
            description: settings.description.clone(),
            res_time_limit: settings.res_time_limit.map(format_datetime),
            res_shared_to: settings.res_shared_to,
            is_anonymous: settings.is_anonymous,
            allow_multiple_responses: settings.allow_multiple_responses,
            resubmission_policy: settings.resubmission_policy,
            administrators: settings.administrators.clone(),
            targets: settings.targets.iter().map(TargetItem::from).collect(),
            questions: questionnaire.questions.iter().map(QuestionDetail::from).collect(),
            is_open: questionnaire.is_open_at(now),
            created_at: format_datetime(questionnaire.created_at),
            modified_at: format_datetime(questionnaire.modified_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessQuestionnaireDetailResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: QuestionnaireDetail,
}

// ============== 설문 목록 ==============

/// 목록 조회 조건
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionnaireListQuery {
    /// 정렬 기준 (기본값 `-created_at`)
    pub sort: Option<QuestionnaireSort>,
    /// 제목 검색 정규식 (대소문자 무시)
    #[validate(length(max = 50, message = "검색어는 50자를 넘을 수 없습니다."))]
    pub search: Option<String>,
    /// 1부터 시작하는 페이지 번호
    #[validate(range(min = 1, message = "page는 1 이상이어야 합니다."))]
    pub page: Option<u32>,
    /// true면 호출자가 응답 대상인 설문을 뺀다
    pub nontargeted: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireListItem {
    pub questionnaire_id: i64,
    pub title: String,
    pub res_time_limit: Option<String>,
    pub res_shared_to: ResShareType,
    pub is_open: bool,
    /// 호출자가 이 설문의 관리자인지
    pub is_administrator: bool,
    /// 호출자가 이 설문의 응답 대상인지
    pub is_targeted: bool,
    pub created_at: String,
    pub modified_at: String,
}

impl QuestionnaireListItem {
    pub fn new(
        questionnaire: &Questionnaire,
        caller: &str,
        is_targeted: bool,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            questionnaire_id: questionnaire.id,
            title: questionnaire.settings.title.clone(),
            res_time_limit: questionnaire.settings.res_time_limit.map(format_datetime),
            res_shared_to: questionnaire.settings.res_shared_to,
            is_open: questionnaire.is_open_at(now),
            is_administrator: questionnaire.is_administrator(caller),
            is_targeted,
            created_at: format_datetime(questionnaire.created_at),
            modified_at: format_datetime(questionnaire.modified_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnairePage {
    /// 마지막 페이지 번호. 결과가 없으면 0
    pub page_max: usize,
    pub questionnaires: Vec<QuestionnaireListItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessQuestionnairePageResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: QuestionnairePage,
}

// ============== 응답 대상 확인 ==============

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FailedGroup {
    pub group_id: String,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetsResponse {
    /// 중복 없이 정렬된 응답 대상 사용자
    pub identities: Vec<String>,
    /// 멤버를 가져오지 못한 그룹
    pub failed_groups: Vec<FailedGroup>,
}

impl From<TargetExpansion> for TargetsResponse {
    fn from(expansion: TargetExpansion) -> Self {
        Self {
            identities: expansion.identities.into_iter().collect(),
            failed_groups: expansion
                .failures
                .into_iter()
                .map(|f| FailedGroup {
                    group_id: f.group_id,
                    reason: f.reason.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessTargetsResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: TargetsResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEmptyResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Option<()>,
}
