use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use super::dto::{AdministratedQuestionnaireItem, TargetedQuestionnaireItem};
use crate::domain::questionnaire::dto::TargetItem;
use crate::domain::questionnaire::model::{Questionnaire, QuestionnaireSort};
use crate::domain::questionnaire::service::{now, restore};
use crate::domain::questionnaire::target::TargetResolver;
use crate::state::AppState;
use crate::store::QuestionnaireFilter;
use crate::utils::error::AppError;
use crate::utils::format_datetime;

pub struct UserService;

/// Closest deadline first, open-ended last, then most recently modified
fn by_deadline(a: &Questionnaire, b: &Questionnaire) -> Ordering {
    let deadline = match (a.settings.res_time_limit, b.settings.res_time_limit) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    deadline
        .then_with(|| b.modified_at.cmp(&a.modified_at))
        .then_with(|| b.id.cmp(&a.id))
}

struct TargetedEntry {
    questionnaire: Questionnaire,
    responded_at: Option<NaiveDateTime>,
    has_response: bool,
}

impl UserService {
    /// Open questionnaires that target `identity`, with its response status.
    ///
    /// `unanswered_only` drops those it has already submitted to.
    pub async fn targeted(
        state: AppState,
        identity: &str,
        sort: Option<QuestionnaireSort>,
        unanswered_only: bool,
    ) -> Result<Vec<TargetedQuestionnaireItem>, AppError> {
        let now = now();
        let records = state
            .store
            .list_questionnaires(&QuestionnaireFilter::default())
            .await?;
        let responses = state.store.list_responses_by_respondent(identity).await?;

        let mut resolver =
            TargetResolver::new(state.groups.as_ref(), state.config.group_lookup_timeout);
        let mut entries = Vec::new();
        for record in records {
            let questionnaire = restore(record)?;
            if !questionnaire.is_open_at(now)
                || !resolver.is_targeted(&questionnaire, identity).await
            {
                continue;
            }

            let own = responses
                .iter()
                .filter(|r| r.questionnaire_id == questionnaire.id);
            let responded_at = own.clone().filter_map(|r| r.submitted_at).max();
            let has_response = own.count() > 0;
            if unanswered_only && responded_at.is_some() {
                continue;
            }
            entries.push(TargetedEntry {
                questionnaire,
                responded_at,
                has_response,
            });
        }

        entries.sort_by(|a, b| match sort {
            Some(sort) => sort.compare(&a.questionnaire.sort_key(), &b.questionnaire.sort_key()),
            None => by_deadline(&a.questionnaire, &b.questionnaire),
        });

        Ok(entries
            .iter()
            .map(|entry| {
                TargetedQuestionnaireItem::new(
                    &entry.questionnaire,
                    entry.responded_at.map(format_datetime),
                    entry.has_response,
                )
            })
            .collect())
    }

    /// Live questionnaires `identity` administers, most recently modified first
    pub async fn administrated(
        state: AppState,
        identity: &str,
    ) -> Result<Vec<AdministratedQuestionnaireItem>, AppError> {
        let now = now();
        let filter = QuestionnaireFilter {
            sort: QuestionnaireSort::ModifiedAtDesc,
            title_pattern: None,
        };
        let records = state.store.list_questionnaires(&filter).await?;

        let mut resolver =
            TargetResolver::new(state.groups.as_ref(), state.config.group_lookup_timeout);
        let mut items = Vec::new();
        for record in records {
            let questionnaire = restore(record)?;
            if !questionnaire.is_administrator(identity) {
                continue;
            }

            let responses = state.store.list_responses(questionnaire.id).await?;
            let respondents: BTreeSet<String> = responses
                .iter()
                .filter(|r| r.is_submitted())
                .filter_map(|r| r.respondent.clone())
                .collect();
            let all_responded = resolver
                .identities(&questionnaire)
                .await
                .iter()
                .all(|target| respondents.contains(target));

            let settings = &questionnaire.settings;
            items.push(AdministratedQuestionnaireItem {
                questionnaire_id: questionnaire.id,
                title: settings.title.clone(),
                description: settings.description.clone(),
                res_time_limit: settings.res_time_limit.map(format_datetime),
                res_shared_to: settings.res_shared_to,
                is_open: questionnaire.is_open_at(now),
                administrators: settings.administrators.clone(),
                targets: settings.targets.iter().map(TargetItem::from).collect(),
                respondents: respondents.into_iter().collect(),
                all_responded,
                created_at: format_datetime(questionnaire.created_at),
                modified_at: format_datetime(questionnaire.modified_at),
            });
        }
        Ok(items)
    }
}
