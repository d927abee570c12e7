//! In-process store used when no database is configured, and by tests

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use super::{QuestionnaireFilter, Store, StoreError, Visibility};
use crate::domain::questionnaire::model::{
    QuestionSpec, QuestionnaireRecord, QuestionnaireSettings, QuestionnaireSpec, StoredQuestion,
};
use crate::domain::response::model::Response;

struct QuestionnaireRow {
    settings: QuestionnaireSettings,
    created_at: NaiveDateTime,
    modified_at: NaiveDateTime,
    deleted_at: Option<NaiveDateTime>,
}

struct QuestionRow {
    questionnaire_id: i64,
    spec: QuestionSpec,
    deleted_at: Option<NaiveDateTime>,
}

struct ResponseRow {
    response: Response,
    live_key: Option<String>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    questionnaires: BTreeMap<i64, QuestionnaireRow>,
    questions: BTreeMap<i64, QuestionRow>,
    responses: BTreeMap<i64, ResponseRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn insert_questions(&mut self, questionnaire_id: i64, specs: &[QuestionSpec]) {
        for spec in specs {
            let id = self.next_id();
            self.questions.insert(
                id,
                QuestionRow {
                    questionnaire_id,
                    spec: spec.clone(),
                    deleted_at: None,
                },
            );
        }
    }

    fn record(&self, questionnaire_id: i64, row: &QuestionnaireRow) -> QuestionnaireRecord {
        let questions = self
            .questions
            .iter()
            .filter(|(_, q)| q.questionnaire_id == questionnaire_id)
            .filter(|(_, q)| Visibility::LiveOnly.admits(q.deleted_at))
            .map(|(id, q)| StoredQuestion {
                id: *id,
                spec: q.spec.clone(),
            })
            .collect();

        QuestionnaireRecord {
            id: questionnaire_id,
            settings: row.settings.clone(),
            questions,
            created_at: row.created_at,
            modified_at: row.modified_at,
            deleted_at: row.deleted_at,
        }
    }

    fn check_live_key(
        &self,
        response_id: Option<i64>,
        questionnaire_id: i64,
        live_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(key) = live_key else {
            return Ok(());
        };
        let taken = self.responses.iter().any(|(id, row)| {
            Some(*id) != response_id
                && row.response.questionnaire_id == questionnaire_id
                && row.live_key.as_deref() == Some(key)
        });
        if taken {
            return Err(StoreError::UniqueViolation);
        }
        Ok(())
    }

    fn live_responses(&self) -> impl Iterator<Item = &Response> {
        self.responses
            .values()
            .map(|row| &row.response)
            .filter(|r| Visibility::LiveOnly.admits(r.deleted_at))
    }
}

/// Keeps everything behind one lock. Writes are atomic per call.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_questionnaire(
        &self,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.questionnaires.insert(
            id,
            QuestionnaireRow {
                settings: spec.settings.clone(),
                created_at: now,
                modified_at: now,
                deleted_at: None,
            },
        );
        tables.insert_questions(id, &spec.questions);

        let row = &tables.questionnaires[&id];
        Ok(tables.record(id, row))
    }

    async fn update_questionnaire(
        &self,
        questionnaire_id: i64,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .questionnaires
            .get_mut(&questionnaire_id)
            .filter(|row| Visibility::LiveOnly.admits(row.deleted_at))
            .ok_or(StoreError::NotFound)?;
        row.settings = spec.settings.clone();
        row.modified_at = now;

        for question in tables.questions.values_mut() {
            if question.questionnaire_id == questionnaire_id && question.deleted_at.is_none() {
                question.deleted_at = Some(now);
            }
        }
        tables.insert_questions(questionnaire_id, &spec.questions);

        let row = &tables.questionnaires[&questionnaire_id];
        Ok(tables.record(questionnaire_id, row))
    }

    async fn soft_delete_questionnaire(
        &self,
        questionnaire_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .questionnaires
            .get_mut(&questionnaire_id)
            .filter(|row| Visibility::LiveOnly.admits(row.deleted_at))
            .ok_or(StoreError::NotFound)?;
        row.deleted_at = Some(now);
        Ok(())
    }

    async fn get_questionnaire(
        &self,
        questionnaire_id: i64,
        visibility: Visibility,
    ) -> Result<Option<QuestionnaireRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questionnaires
            .get(&questionnaire_id)
            .filter(|row| visibility.admits(row.deleted_at))
            .map(|row| tables.record(questionnaire_id, row)))
    }

    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
    ) -> Result<Vec<QuestionnaireRecord>, StoreError> {
        let tables = self.tables.read().await;
        let mut records: Vec<QuestionnaireRecord> = tables
            .questionnaires
            .iter()
            .filter(|(_, row)| Visibility::LiveOnly.admits(row.deleted_at))
            .filter(|(_, row)| {
                filter
                    .title_pattern
                    .as_ref()
                    .map_or(true, |pattern| pattern.is_match(&row.settings.title))
            })
            .map(|(id, row)| tables.record(*id, row))
            .collect();
        records.sort_by(|a, b| filter.sort.compare(&a.sort_key(), &b.sort_key()));
        Ok(records)
    }

    async fn get_response(
        &self,
        response_id: i64,
        visibility: Visibility,
    ) -> Result<Option<Response>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .responses
            .get(&response_id)
            .map(|row| &row.response)
            .filter(|r| visibility.admits(r.deleted_at))
            .cloned())
    }

    async fn find_live_response(
        &self,
        questionnaire_id: i64,
        respondent: &str,
    ) -> Result<Option<Response>, StoreError> {
        let tables = self.tables.read().await;
        let found = tables
            .live_responses()
            .find(|r| r.questionnaire_id == questionnaire_id && r.is_owned_by(respondent))
            .cloned();
        Ok(found)
    }

    async fn list_responses(&self, questionnaire_id: i64) -> Result<Vec<Response>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_responses()
            .filter(|r| r.questionnaire_id == questionnaire_id)
            .cloned()
            .collect())
    }

    async fn list_responses_by_respondent(
        &self,
        respondent: &str,
    ) -> Result<Vec<Response>, StoreError> {
        let tables = self.tables.read().await;
        let mut responses: Vec<Response> = tables
            .live_responses()
            .filter(|r| r.is_owned_by(respondent))
            .cloned()
            .collect();
        responses.sort_by(|a, b| (b.modified_at, b.id).cmp(&(a.modified_at, a.id)));
        Ok(responses)
    }

    async fn create_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        tables.check_live_key(None, response.questionnaire_id, live_key)?;

        let id = tables.next_id();
        let mut stored = response.clone();
        stored.id = Some(id);
        tables.responses.insert(
            id,
            ResponseRow {
                response: stored,
                live_key: live_key.map(String::from),
            },
        );
        Ok(id)
    }

    async fn update_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let id = response.id.ok_or(StoreError::NotFound)?;
        let mut tables = self.tables.write().await;
        let is_live = tables
            .responses
            .get(&id)
            .is_some_and(|row| Visibility::LiveOnly.admits(row.response.deleted_at));
        if !is_live {
            return Err(StoreError::NotFound);
        }
        tables.check_live_key(Some(id), response.questionnaire_id, live_key)?;

        let row = tables.responses.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.response = response.clone();
        row.live_key = live_key.map(String::from);
        Ok(())
    }

    async fn soft_delete_response(
        &self,
        response_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let row = tables
            .responses
            .get_mut(&response_id)
            .filter(|row| Visibility::LiveOnly.admits(row.response.deleted_at))
            .ok_or(StoreError::NotFound)?;
        row.response.deleted_at = Some(now);
        row.live_key = None;
        Ok(())
    }
}
