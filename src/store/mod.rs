//! Persistence boundary
//!
//! Every read goes through [`Visibility`] so soft-deleted rows are filtered
//! in one place.

pub mod memory;
pub mod sea_orm_store;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex::Regex;
use sea_orm::{ColumnTrait, Condition, DbErr, SqlErr};

use crate::domain::questionnaire::model::{
    QuestionnaireRecord, QuestionnaireSort, QuestionnaireSpec,
};
use crate::domain::response::model::Response;

pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

/// Whether soft-deleted rows are visible to a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    LiveOnly,
    /// Administrative reads, and withdraw which must tell "gone" from "never existed"
    IncludeDeleted,
}

impl Visibility {
    pub fn admits(self, deleted_at: Option<NaiveDateTime>) -> bool {
        match self {
            Visibility::LiveOnly => deleted_at.is_none(),
            Visibility::IncludeDeleted => true,
        }
    }

    /// The same predicate as a query condition on a `deleted_at` column
    pub fn condition<C: ColumnTrait>(self, deleted_at: C) -> Condition {
        match self {
            Visibility::LiveOnly => Condition::all().add(deleted_at.is_null()),
            Visibility::IncludeDeleted => Condition::all(),
        }
    }
}

/// Narrows and orders a listing of live questionnaires
#[derive(Debug, Clone, Default)]
pub struct QuestionnaireFilter {
    pub sort: QuestionnaireSort,
    /// Matched case-insensitively against titles
    pub title_pattern: Option<Regex>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("a live response already exists for this respondent")]
    UniqueViolation,

    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::UniqueViolation,
            _ => StoreError::Database(err.to_string()),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Persists a new questionnaire with its questions, administrators and targets
    async fn create_questionnaire(
        &self,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError>;

    /// Replaces settings and the question set of a live questionnaire.
    /// Previous questions are soft-deleted.
    async fn update_questionnaire(
        &self,
        questionnaire_id: i64,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError>;

    async fn soft_delete_questionnaire(
        &self,
        questionnaire_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError>;

    /// Loads a questionnaire with its live questions
    async fn get_questionnaire(
        &self,
        questionnaire_id: i64,
        visibility: Visibility,
    ) -> Result<Option<QuestionnaireRecord>, StoreError>;

    /// Live questionnaires matching `filter`, in its order
    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
    ) -> Result<Vec<QuestionnaireRecord>, StoreError>;

    async fn get_response(
        &self,
        response_id: i64,
        visibility: Visibility,
    ) -> Result<Option<Response>, StoreError>;

    async fn find_live_response(
        &self,
        questionnaire_id: i64,
        respondent: &str,
    ) -> Result<Option<Response>, StoreError>;

    /// Live responses of a questionnaire ordered by id
    async fn list_responses(&self, questionnaire_id: i64) -> Result<Vec<Response>, StoreError>;

    /// Live responses given by `respondent`, newest first
    async fn list_responses_by_respondent(
        &self,
        respondent: &str,
    ) -> Result<Vec<Response>, StoreError>;

    /// Inserts a response and its answers, returning the new id.
    ///
    /// Fails with [`StoreError::UniqueViolation`] when `live_key` is already
    /// held by another live response of the same questionnaire.
    async fn create_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<i64, StoreError>;

    /// Overwrites a stored response and replaces its answers
    async fn update_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Marks a response deleted and releases its live key
    async fn soft_delete_response(
        &self,
        response_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError>;
}
