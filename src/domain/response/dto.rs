use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::model::{Answer, Response};
use crate::utils::format_datetime;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub question_id: i64,
    /// 답변 내용. 객관식은 선택지 내용, 복수 선택은 항목을 여러 개 보낸다.
    #[validate(length(max = 10000, message = "답변은 10000자를 초과할 수 없습니다."))]
    pub body: Option<String>,
}

impl From<AnswerItem> for Answer {
    fn from(item: AnswerItem) -> Self {
        Answer {
            question_id: item.question_id,
            body: item.body,
        }
    }
}

impl From<&Answer> for AnswerItem {
    fn from(answer: &Answer) -> Self {
        AnswerItem {
            question_id: answer.question_id,
            body: answer.body.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerItem>,

    /// true면 임시 저장. 필수 질문을 비워둘 수 있다.
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    pub response_id: i64,
    pub questionnaire_id: i64,
    /// 익명 설문이면 null
    pub respondent: Option<String>,
    pub is_draft: bool,
    pub submitted_at: Option<String>,
    pub modified_at: String,
    pub answers: Vec<AnswerItem>,
}

impl ResponseDetail {
    pub fn new(response_id: i64, response: &Response) -> Self {
        Self {
            response_id,
            questionnaire_id: response.questionnaire_id,
            respondent: response.respondent.clone(),
            is_draft: !response.is_submitted(),
            submitted_at: response.submitted_at.map(format_datetime),
            modified_at: format_datetime(response.modified_at),
            answers: response.answers.iter().map(AnswerItem::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponseDetailResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: ResponseDetail,
}

// ============== 내 응답 목록 ==============

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyResponseItem {
    pub response_id: i64,
    pub questionnaire_id: i64,
    pub questionnaire_title: String,
    pub is_draft: bool,
    pub submitted_at: Option<String>,
    pub modified_at: String,
}

impl MyResponseItem {
    pub fn new(response_id: i64, response: &Response, questionnaire_title: &str) -> Self {
        Self {
            response_id,
            questionnaire_id: response.questionnaire_id,
            questionnaire_title: questionnaire_title.to_string(),
            is_draft: !response.is_submitted(),
            submitted_at: response.submitted_at.map(format_datetime),
            modified_at: format_datetime(response.modified_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessMyResponseListResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Vec<MyResponseItem>,
}
