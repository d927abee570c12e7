use chrono::{NaiveDateTime, Utc};
use regex::RegexBuilder;
use tracing::{error, info};

use super::dto::{
    QuestionnaireDetail, QuestionnaireListItem, QuestionnaireListQuery, QuestionnairePage,
    QuestionnaireRequest, TargetsResponse,
};
use super::model::{Questionnaire, QuestionnaireRecord};
use super::target::{expand_targets, TargetResolver};
use crate::domain::chat::message::questionnaire_created_message;
use crate::domain::chat::notify_best_effort;
use crate::domain::response::result::{aggregate, QuestionnaireResult};
use crate::state::AppState;
use crate::store::{QuestionnaireFilter, Visibility};
use crate::utils::error::AppError;

/// Questionnaires per page of the listing
const PAGE_SIZE: usize = 20;

pub struct QuestionnaireService;

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Rebuilds a stored questionnaire. A stored definition that no longer
/// passes its checks (e.g. a broken regex) is a server-side fault.
pub(crate) fn restore(record: QuestionnaireRecord) -> Result<Questionnaire, AppError> {
    let questionnaire_id = record.id;
    Questionnaire::restore(record).map_err(|e| {
        error!(questionnaire_id, error = %e, "stored questionnaire is invalid");
        AppError::internal_error(format!("설문 {}의 저장된 정의가 올바르지 않습니다.", questionnaire_id))
    })
}

/// Loads a questionnaire, or `NotFound` when missing or deleted
pub(crate) async fn load_questionnaire(
    state: &AppState,
    questionnaire_id: i64,
    visibility: Visibility,
) -> Result<Questionnaire, AppError> {
    let record = state
        .store
        .get_questionnaire(questionnaire_id, visibility)
        .await?
        .ok_or_else(|| AppError::not_found("존재하지 않는 설문입니다."))?;
    restore(record)
}

fn ensure_administrator(questionnaire: &Questionnaire, caller: &str) -> Result<(), AppError> {
    if questionnaire.is_administrator(caller) {
        Ok(())
    } else {
        Err(AppError::forbidden("설문 관리자만 할 수 있는 작업입니다."))
    }
}

impl QuestionnaireService {
    pub async fn create(
        state: AppState,
        caller: &str,
        req: QuestionnaireRequest,
    ) -> Result<QuestionnaireDetail, AppError> {
        let now = now();
        let spec = req.into_spec(caller);
        spec.validate_new(now)?;

        let record = state.store.create_questionnaire(&spec, now).await?;
        let questionnaire = restore(record)?;
        info!(
            questionnaire_id = questionnaire.id,
            created_by = caller,
            questions = questionnaire.questions.len(),
            "questionnaire created"
        );

        let message = questionnaire_created_message(&questionnaire, &state.config.chat.app_base_url);
        notify_best_effort(state.notifier.as_ref(), &message).await;
        state.reminders.schedule(&questionnaire, now).await;

        Ok(QuestionnaireDetail::new(&questionnaire, now))
    }

    /// One page of live questionnaires.
    ///
    /// An empty result is page 0 of 0; asking past the last page of a
    /// non-empty result is a bad request.
    pub async fn list(
        state: AppState,
        caller: &str,
        query: QuestionnaireListQuery,
    ) -> Result<QuestionnairePage, AppError> {
        let now = now();
        let title_pattern = match query.search.as_deref().filter(|s| !s.is_empty()) {
            Some(search) => Some(
                RegexBuilder::new(search)
                    .case_insensitive(true)
                    .build()
                    .map_err(|_| AppError::bad_request("검색어가 올바른 정규식이 아닙니다."))?,
            ),
            None => None,
        };
        let filter = QuestionnaireFilter {
            sort: query.sort.unwrap_or_default(),
            title_pattern,
        };
        let records = state.store.list_questionnaires(&filter).await?;

        let skip_targeted = query.nontargeted.unwrap_or(false);
        let mut resolver =
            TargetResolver::new(state.groups.as_ref(), state.config.group_lookup_timeout);
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let questionnaire = restore(record)?;
            let is_targeted = resolver.is_targeted(&questionnaire, caller).await;
            if skip_targeted && is_targeted {
                continue;
            }
            items.push(QuestionnaireListItem::new(&questionnaire, caller, is_targeted, now));
        }

        let page = query.page.unwrap_or(1).max(1) as usize;
        let page_max = items.len().div_ceil(PAGE_SIZE);
        if page_max > 0 && page > page_max {
            return Err(AppError::bad_request(format!(
                "페이지 번호가 너무 큽니다. 마지막 페이지는 {}입니다.",
                page_max
            )));
        }

        Ok(QuestionnairePage {
            page_max,
            questionnaires: items
                .into_iter()
                .skip((page - 1) * PAGE_SIZE)
                .take(PAGE_SIZE)
                .collect(),
        })
    }

    pub async fn get(state: AppState, questionnaire_id: i64) -> Result<QuestionnaireDetail, AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        Ok(QuestionnaireDetail::new(&questionnaire, now()))
    }

    /// Replaces settings and questions. The deadline is not re-checked.
    pub async fn update(
        state: AppState,
        caller: &str,
        questionnaire_id: i64,
        req: QuestionnaireRequest,
    ) -> Result<QuestionnaireDetail, AppError> {
        let current = load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        ensure_administrator(&current, caller)?;

        let now = now();
        let spec = req.into_spec(caller);
        spec.validate_structure()?;

        let record = state
            .store
            .update_questionnaire(questionnaire_id, &spec, now)
            .await?;
        let questionnaire = restore(record)?;
        info!(questionnaire_id, updated_by = caller, "questionnaire updated");
        state.reminders.schedule(&questionnaire, now).await;

        Ok(QuestionnaireDetail::new(&questionnaire, now))
    }

    pub async fn delete(state: AppState, caller: &str, questionnaire_id: i64) -> Result<(), AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        ensure_administrator(&questionnaire, caller)?;

        state
            .store
            .soft_delete_questionnaire(questionnaire_id, now())
            .await?;
        state.reminders.cancel(questionnaire_id).await;
        info!(questionnaire_id, deleted_by = caller, "questionnaire deleted");
        Ok(())
    }

    /// Aggregated results, subject to the questionnaire's sharing scope
    pub async fn results(
        state: AppState,
        caller: &str,
        questionnaire_id: i64,
    ) -> Result<QuestionnaireResult, AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;

        let has_live_response = state
            .store
            .find_live_response(questionnaire_id, caller)
            .await?
            .is_some();
        let role = questionnaire.role_of(caller, has_live_response);
        if !questionnaire.can_view(role) {
            return Err(AppError::forbidden("결과를 볼 수 있는 권한이 없습니다."));
        }

        let responses = state.store.list_responses(questionnaire_id).await?;
        Ok(aggregate(&questionnaire, &responses))
    }

    /// Concrete respondent set. Administrators only.
    pub async fn targets(
        state: AppState,
        caller: &str,
        questionnaire_id: i64,
    ) -> Result<TargetsResponse, AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        ensure_administrator(&questionnaire, caller)?;

        let expansion = expand_targets(
            &questionnaire,
            state.groups.as_ref(),
            state.config.group_lookup_timeout,
        )
        .await;
        Ok(TargetsResponse::from(expansion))
    }
}
