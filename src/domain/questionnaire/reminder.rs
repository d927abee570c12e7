//! 마감 알림
//!
//! 마감이 있는 설문마다 태스크 하나가 1주, 1일, 1시간, 30분, 5분 전 시각을
//! 차례로 기다렸다가 아직 제출하지 않은 대상자를 채팅으로 멘션한다.
//! 설문이 수정되면 태스크를 새로 띄우고, 삭제되면 중단한다.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::model::Questionnaire;
use super::target::TargetResolver;
use crate::config::AppConfig;
use crate::domain::chat::message::deadline_reminder_message;
use crate::domain::chat::{notify_best_effort, GroupMembership, Notifier};
use crate::store::{QuestionnaireFilter, Store, StoreError, Visibility};

/// Minutes before the deadline, with the wording used in the message
const REMINDER_OFFSETS: [(i64, &str); 5] = [
    (7 * 24 * 60, "1 week"),
    (24 * 60, "1 day"),
    (60, "1 hour"),
    (30, "30 minutes"),
    (5, "5 minutes"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    pub at: NaiveDateTime,
    pub remaining: &'static str,
}

/// Reminders still ahead of `now`, earliest first
pub fn reminder_plan(deadline: NaiveDateTime, now: NaiveDateTime) -> Vec<Reminder> {
    REMINDER_OFFSETS
        .iter()
        .map(|&(minutes, remaining)| Reminder {
            at: deadline - chrono::Duration::minutes(minutes),
            remaining,
        })
        .filter(|reminder| reminder.at > now)
        .collect()
}

struct Inner {
    store: Arc<dyn Store>,
    groups: Arc<dyn GroupMembership>,
    notifier: Arc<dyn Notifier>,
    app_base_url: String,
    group_lookup_timeout: Duration,
    tasks: Mutex<HashMap<i64, JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        groups: Arc<dyn GroupMembership>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                groups,
                notifier,
                app_base_url: config.chat.app_base_url.clone(),
                group_lookup_timeout: config.group_lookup_timeout,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Replaces whatever was pending for this questionnaire
    pub async fn schedule(&self, questionnaire: &Questionnaire, now: NaiveDateTime) {
        let questionnaire_id = questionnaire.id;
        let mut tasks = self.inner.tasks.lock().await;
        tasks.retain(|_, task| !task.is_finished());
        if let Some(previous) = tasks.remove(&questionnaire_id) {
            previous.abort();
        }

        let Some(deadline) = questionnaire.settings.res_time_limit else {
            return;
        };
        let plan = reminder_plan(deadline, now);
        if plan.is_empty() {
            return;
        }

        debug!(questionnaire_id, reminders = plan.len(), "deadline reminders scheduled");
        let inner = self.inner.clone();
        tasks.insert(
            questionnaire_id,
            tokio::spawn(run(inner, questionnaire_id, deadline, plan, now)),
        );
    }

    pub async fn cancel(&self, questionnaire_id: i64) {
        if let Some(task) = self.inner.tasks.lock().await.remove(&questionnaire_id) {
            task.abort();
            debug!(questionnaire_id, "deadline reminders cancelled");
        }
    }

    /// Schedules every live questionnaire whose deadline is still ahead.
    /// Returns how many got reminders.
    pub async fn restore(&self, now: NaiveDateTime) -> Result<usize, StoreError> {
        let records = self
            .inner
            .store
            .list_questionnaires(&QuestionnaireFilter::default())
            .await?;

        let mut scheduled = 0;
        for record in records {
            let questionnaire_id = record.id;
            let questionnaire = match Questionnaire::restore(record) {
                Ok(questionnaire) => questionnaire,
                Err(error) => {
                    warn!(questionnaire_id, %error, "stored questionnaire is invalid, no reminders");
                    continue;
                }
            };
            if questionnaire
                .settings
                .res_time_limit
                .is_some_and(|deadline| !reminder_plan(deadline, now).is_empty())
            {
                self.schedule(&questionnaire, now).await;
                scheduled += 1;
            }
        }
        Ok(scheduled)
    }
}

/// Sleeps on the tokio clock so paused-time tests drive it
async fn run(
    inner: Arc<Inner>,
    questionnaire_id: i64,
    deadline: NaiveDateTime,
    plan: Vec<Reminder>,
    now: NaiveDateTime,
) {
    let start = Instant::now();
    for reminder in plan {
        let wait = (reminder.at - now).to_std().unwrap_or_default();
        let due = start + wait;
        // long sleeps may wake early
        while Instant::now() < due {
            tokio::time::sleep_until(due).await;
        }
        inner.remind(questionnaire_id, deadline, reminder.remaining).await;
    }
}

impl Inner {
    async fn remind(&self, questionnaire_id: i64, deadline: NaiveDateTime, remaining: &str) {
        let record = match self
            .store
            .get_questionnaire(questionnaire_id, Visibility::LiveOnly)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(questionnaire_id, "questionnaire is gone, reminder dropped");
                return;
            }
            Err(error) => {
                warn!(questionnaire_id, %error, "reminder could not load questionnaire");
                return;
            }
        };
        let questionnaire = match Questionnaire::restore(record) {
            Ok(questionnaire) => questionnaire,
            Err(error) => {
                warn!(questionnaire_id, %error, "stored questionnaire is invalid");
                return;
            }
        };
        if questionnaire.settings.res_time_limit != Some(deadline) {
            return;
        }

        let responses = match self.store.list_responses(questionnaire_id).await {
            Ok(responses) => responses,
            Err(error) => {
                warn!(questionnaire_id, %error, "reminder could not load responses");
                return;
            }
        };
        let answered: BTreeSet<&str> = responses
            .iter()
            .filter(|r| r.is_submitted())
            .filter_map(|r| r.respondent.as_deref())
            .collect();

        let mut resolver = TargetResolver::new(self.groups.as_ref(), self.group_lookup_timeout);
        let pending: Vec<String> = resolver
            .identities(&questionnaire)
            .await
            .into_iter()
            .filter(|identity| !answered.contains(identity.as_str()))
            .collect();
        if pending.is_empty() {
            return;
        }

        let message =
            deadline_reminder_message(&questionnaire, remaining, &pending, &self.app_base_url);
        notify_best_effort(self.notifier.as_ref(), &message).await;
        info!(
            questionnaire_id,
            remaining,
            pending = pending.len(),
            "deadline reminder sent"
        );
    }
}
