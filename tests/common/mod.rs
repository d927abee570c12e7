//! 통합 테스트 공용 도우미: 메모리 저장소와 채팅 서비스 대역

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::NaiveDateTime;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use questionnaire_server::app;
use questionnaire_server::config::AppConfig;
use questionnaire_server::domain::chat::{ChatError, GroupMembership, IdentityResolver, Notifier};
use questionnaire_server::domain::questionnaire::model::{QuestionnaireRecord, QuestionnaireSpec};
use questionnaire_server::domain::response::model::Response as StoredResponse;
use questionnaire_server::state::AppState;
use questionnaire_server::store::{
    MemoryStore, QuestionnaireFilter, Store, StoreError, Visibility,
};

pub const FUTURE: &str = "2099-12-31T23:59:00";

/// Any token is its own identity, except "invalid"
pub struct StubIdentity;

#[async_trait]
impl IdentityResolver for StubIdentity {
    async fn resolve(&self, credential: &str) -> Result<String, ChatError> {
        match credential {
            "invalid" => Err(ChatError::Unauthorized),
            identity => Ok(identity.to_string()),
        }
    }
}

pub struct StubGroups {
    pub members: HashMap<String, Vec<String>>,
}

#[async_trait]
impl GroupMembership for StubGroups {
    async fn members(&self, group_id: &str) -> Result<Vec<String>, ChatError> {
        self.members
            .get(group_id)
            .cloned()
            .ok_or_else(|| ChatError::GroupNotFound(group_id.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), ChatError> {
        self.sent.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(ChatError::DeliveryError("webhook returned 500".to_string()));
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn Store>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::default())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(Arc::new(MemoryStore::new()), notifier)
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self::build(store, RecordingNotifier::default())
    }

    fn build(store: Arc<dyn Store>, notifier: RecordingNotifier) -> Self {
        let notifier = Arc::new(notifier);
        let groups = StubGroups {
            members: HashMap::from([(
                "backend".to_string(),
                vec!["bob".to_string(), "carol".to_string()],
            )]),
        };
        let state = AppState::new(
            store.clone(),
            AppConfig::default(),
            Arc::new(StubIdentity),
            Arc::new(groups),
            notifier.clone(),
        );

        Self {
            router: app(state),
            store,
            notifier,
        }
    }

    pub async fn call(&self, request: Request<Body>) -> (u16, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status().as_u16();
        (status, parse_body(response).await)
    }

    pub async fn get(&self, uri: &str, user: &str) -> (u16, Value) {
        self.call(request("GET", uri, Some(user), None)).await
    }

    pub async fn delete(&self, uri: &str, user: &str) -> (u16, Value) {
        self.call(request("DELETE", uri, Some(user), None)).await
    }

    pub async fn send_json(&self, method: &str, uri: &str, user: &str, body: Value) -> (u16, Value) {
        self.call(request(method, uri, Some(user), Some(body))).await
    }

    /// Creates a questionnaire as `admin` and returns its id
    pub async fn create_questionnaire(&self, admin: &str, body: Value) -> i64 {
        let (status, body) = self
            .send_json("POST", "/api/questionnaires", admin, body)
            .await;
        assert_eq!(status, 200, "{}", body);
        body["result"]["questionnaireId"].as_i64().unwrap()
    }

    /// Id of the question at `index` in page order
    pub async fn question_id(&self, questionnaire_id: i64, index: usize) -> i64 {
        let (_, body) = self
            .get(&format!("/api/questionnaires/{}", questionnaire_id), "admin")
            .await;
        body["result"]["questions"][index]["questionId"]
            .as_i64()
            .unwrap()
    }
}

/// What a concurrent request does between our read and our write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    /// Another submit by the same respondent lands just before our insert
    CompetingSubmit,
    /// Inserts fail with a unique violation this many times
    RefuseInserts(usize),
    /// The response is withdrawn just before our overwrite
    WithdrawBeforeOverwrite,
    /// The response is withdrawn just before our withdraw
    WithdrawBeforeWithdraw,
}

/// Memory store that plays one [`Race`] against the service
pub struct RacingStore {
    pub inner: MemoryStore,
    race: Mutex<Option<Race>>,
}

impl RacingStore {
    pub fn new(race: Race) -> Self {
        Self {
            inner: MemoryStore::new(),
            race: Mutex::new(Some(race)),
        }
    }

    fn fire(&self, applies: impl Fn(Race) -> bool) -> Option<Race> {
        let mut race = self.race.lock().unwrap();
        let current = (*race).filter(|r| applies(*r))?;
        *race = match current {
            Race::RefuseInserts(n) if n > 1 => Some(Race::RefuseInserts(n - 1)),
            _ => None,
        };
        Some(current)
    }
}

#[async_trait]
impl Store for RacingStore {
    async fn create_questionnaire(
        &self,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        self.inner.create_questionnaire(spec, now).await
    }

    async fn update_questionnaire(
        &self,
        questionnaire_id: i64,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        self.inner.update_questionnaire(questionnaire_id, spec, now).await
    }

    async fn soft_delete_questionnaire(
        &self,
        questionnaire_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        self.inner.soft_delete_questionnaire(questionnaire_id, now).await
    }

    async fn get_questionnaire(
        &self,
        questionnaire_id: i64,
        visibility: Visibility,
    ) -> Result<Option<QuestionnaireRecord>, StoreError> {
        self.inner.get_questionnaire(questionnaire_id, visibility).await
    }

    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
    ) -> Result<Vec<QuestionnaireRecord>, StoreError> {
        self.inner.list_questionnaires(filter).await
    }

    async fn get_response(
        &self,
        response_id: i64,
        visibility: Visibility,
    ) -> Result<Option<StoredResponse>, StoreError> {
        self.inner.get_response(response_id, visibility).await
    }

    async fn find_live_response(
        &self,
        questionnaire_id: i64,
        respondent: &str,
    ) -> Result<Option<StoredResponse>, StoreError> {
        self.inner.find_live_response(questionnaire_id, respondent).await
    }

    async fn list_responses(
        &self,
        questionnaire_id: i64,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        self.inner.list_responses(questionnaire_id).await
    }

    async fn list_responses_by_respondent(
        &self,
        respondent: &str,
    ) -> Result<Vec<StoredResponse>, StoreError> {
        self.inner.list_responses_by_respondent(respondent).await
    }

    async fn create_response(
        &self,
        response: &StoredResponse,
        live_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        match self.fire(|r| matches!(r, Race::CompetingSubmit | Race::RefuseInserts(_))) {
            Some(Race::CompetingSubmit) => {
                let competitor = StoredResponse {
                    answers: vec![],
                    ..response.clone()
                };
                self.inner.create_response(&competitor, live_key).await?;
                Err(StoreError::UniqueViolation)
            }
            Some(_) => Err(StoreError::UniqueViolation),
            None => self.inner.create_response(response, live_key).await,
        }
    }

    async fn update_response(
        &self,
        response: &StoredResponse,
        live_key: Option<&str>,
    ) -> Result<(), StoreError> {
        if let (Some(_), Some(id)) = (
            self.fire(|r| r == Race::WithdrawBeforeOverwrite),
            response.id,
        ) {
            self.inner.soft_delete_response(id, response.modified_at).await?;
        }
        self.inner.update_response(response, live_key).await
    }

    async fn soft_delete_response(
        &self,
        response_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        if self.fire(|r| r == Race::WithdrawBeforeWithdraw).is_some() {
            self.inner.soft_delete_response(response_id, now).await?;
        }
        self.inner.soft_delete_response(response_id, now).await
    }
}

pub fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("Authorization", format!("Bearer {}", user));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn parse_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
