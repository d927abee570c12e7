use std::collections::HashMap;

use tracing::{info, warn};

use super::dto::{MyResponseItem, ResponseDetail, SubmitResponseRequest};
use super::error::ResponseError;
use super::model::{Answer, Response, SubmissionKind};
use crate::domain::chat::message::response_submitted_message;
use crate::domain::chat::notify_best_effort;
use crate::domain::questionnaire::model::Questionnaire;
use crate::domain::questionnaire::service::{load_questionnaire, now, restore};
use crate::state::AppState;
use crate::store::{StoreError, Visibility};
use crate::utils::error::AppError;

/// A concurrent submit can win the live key between our lookup and insert,
/// and a concurrent withdraw can remove the response we are about to
/// overwrite. The decision is retried this many times before giving up.
const STORE_RACE_RETRIES: usize = 1;

pub struct ResponseService;

fn ensure_reader(
    response: &Response,
    questionnaire: &Questionnaire,
    caller: &str,
) -> Result<(), AppError> {
    if response.is_owned_by(caller) || questionnaire.is_administrator(caller) {
        Ok(())
    } else {
        Err(AppError::forbidden("본인 응답 또는 관리 중인 설문의 응답만 볼 수 있습니다."))
    }
}

impl ResponseService {
    /// Creates the caller's response or overwrites their live one.
    ///
    /// Nothing is stored unless every answer passes validation.
    pub async fn submit(
        state: AppState,
        caller: &str,
        questionnaire_id: i64,
        req: SubmitResponseRequest,
    ) -> Result<ResponseDetail, AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        let kind = if req.is_draft {
            SubmissionKind::Draft
        } else {
            SubmissionKind::Final
        };
        let answers: Vec<Answer> = req.answers.into_iter().map(Answer::from).collect();
        let single_response = !questionnaire.settings.is_anonymous
            && !questionnaire.settings.allow_multiple_responses;

        let mut attempt = 0;
        let (response_id, response) = loop {
            let existing = if single_response {
                state
                    .store
                    .find_live_response(questionnaire_id, caller)
                    .await?
            } else {
                None
            };

            let response = Response::submit(
                &questionnaire,
                existing,
                answers.clone(),
                Some(caller),
                kind,
                now(),
            )?;
            let live_key = response.live_key(&questionnaire);

            let stored = match response.id {
                Some(id) => state
                    .store
                    .update_response(&response, live_key.as_deref())
                    .await
                    .map(|_| id),
                None => {
                    state
                        .store
                        .create_response(&response, live_key.as_deref())
                        .await
                }
            };

            let overwritten = response.id.is_some();
            match stored {
                Ok(id) => break (id, response),
                Err(StoreError::UniqueViolation) if attempt < STORE_RACE_RETRIES => {
                    attempt += 1;
                    warn!(questionnaire_id, attempt, "live response raced, retrying");
                }
                Err(StoreError::NotFound) if overwritten && attempt < STORE_RACE_RETRIES => {
                    attempt += 1;
                    warn!(
                        questionnaire_id,
                        attempt, "live response withdrawn before overwrite, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            questionnaire_id,
            response_id,
            draft = !response.is_submitted(),
            "response saved"
        );

        if kind == SubmissionKind::Final {
            let message = response_submitted_message(
                &questionnaire,
                response.respondent.as_deref(),
                &state.config.chat.app_base_url,
            );
            notify_best_effort(state.notifier.as_ref(), &message).await;
        }

        Ok(ResponseDetail::new(response_id, &response))
    }

    pub async fn get(
        state: AppState,
        caller: &str,
        response_id: i64,
    ) -> Result<ResponseDetail, AppError> {
        let response = state
            .store
            .get_response(response_id, Visibility::LiveOnly)
            .await?
            .ok_or_else(|| AppError::not_found("존재하지 않는 응답입니다."))?;
        let questionnaire =
            load_questionnaire(&state, response.questionnaire_id, Visibility::LiveOnly).await?;
        ensure_reader(&response, &questionnaire, caller)?;

        Ok(ResponseDetail::new(response_id, &response))
    }

    /// The caller's live responses to live questionnaires, newest first
    pub async fn list_mine(state: AppState, caller: &str) -> Result<Vec<MyResponseItem>, AppError> {
        let responses = state.store.list_responses_by_respondent(caller).await?;

        let mut titles: HashMap<i64, Option<String>> = HashMap::new();
        let mut items = Vec::with_capacity(responses.len());
        for response in responses {
            let questionnaire_id = response.questionnaire_id;
            if !titles.contains_key(&questionnaire_id) {
                let title = match state
                    .store
                    .get_questionnaire(questionnaire_id, Visibility::LiveOnly)
                    .await?
                {
                    Some(record) => Some(restore(record)?.settings.title),
                    None => None,
                };
                titles.insert(questionnaire_id, title);
            }

            let (Some(response_id), Some(Some(title))) =
                (response.id, titles.get(&questionnaire_id))
            else {
                continue;
            };
            items.push(MyResponseItem::new(response_id, &response, title));
        }
        Ok(items)
    }

    /// The caller's live responses to one live questionnaire, newest first
    pub async fn list_mine_for(
        state: AppState,
        caller: &str,
        questionnaire_id: i64,
    ) -> Result<Vec<MyResponseItem>, AppError> {
        let questionnaire =
            load_questionnaire(&state, questionnaire_id, Visibility::LiveOnly).await?;
        let responses = state.store.list_responses_by_respondent(caller).await?;

        Ok(responses
            .iter()
            .filter(|r| r.questionnaire_id == questionnaire_id)
            .filter_map(|r| {
                r.id.map(|id| MyResponseItem::new(id, r, &questionnaire.settings.title))
            })
            .collect())
    }

    /// Soft-deletes a response. Allowed for its respondent and the
    /// questionnaire's administrators, also after the deadline.
    pub async fn withdraw(state: AppState, caller: &str, response_id: i64) -> Result<(), AppError> {
        let mut response = state
            .store
            .get_response(response_id, Visibility::IncludeDeleted)
            .await?
            .ok_or_else(|| AppError::not_found("존재하지 않는 응답입니다."))?;
        let questionnaire =
            load_questionnaire(&state, response.questionnaire_id, Visibility::IncludeDeleted)
                .await?;
        ensure_reader(&response, &questionnaire, caller)?;

        let now = now();
        response.withdraw(now)?;
        match state.store.soft_delete_response(response_id, now).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(ResponseError::AlreadyDeleted.into()),
            Err(e) => return Err(e.into()),
        }

        info!(
            response_id,
            questionnaire_id = questionnaire.id,
            withdrawn_by = caller,
            "response withdrawn"
        );
        Ok(())
    }
}
