//! MySQL-backed store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::{QuestionnaireFilter, Store, StoreError, Visibility};
use crate::domain::questionnaire::entity::target::TargetKind;
use crate::domain::questionnaire::entity::{
    administrator, question, question_option, questionnaire, scale_label, target, validation,
};
use crate::domain::questionnaire::model::{
    QuestionOption, QuestionSpec, QuestionnaireRecord, QuestionnaireSettings, QuestionnaireSort,
    QuestionnaireSpec, ScaleLabel, StoredQuestion, Target, ValidationRule,
};
use crate::domain::response::entity::{answer, respondent};
use crate::domain::response::model::{Answer, Response};

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn group_by<K, V>(rows: Vec<V>, key: impl Fn(&V) -> K) -> HashMap<K, Vec<V>>
where
    K: std::hash::Hash + Eq,
{
    let mut grouped: HashMap<K, Vec<V>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row)).or_default().push(row);
    }
    grouped
}

async fn insert_questions<C: ConnectionTrait>(
    conn: &C,
    questionnaire_id: i64,
    specs: &[QuestionSpec],
    now: NaiveDateTime,
) -> Result<(), StoreError> {
    for spec in specs {
        let inserted = question::ActiveModel {
            questionnaire_id: Set(questionnaire_id),
            page_num: Set(spec.page_num),
            question_num: Set(spec.question_num),
            question_type: Set(spec.question_type),
            body: Set(spec.body.clone()),
            is_required: Set(spec.is_required),
            created_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        let question_id = inserted.question_id;

        for option in &spec.options {
            question_option::Entity::insert(question_option::ActiveModel {
                question_id: Set(question_id),
                option_num: Set(option.option_num),
                body: Set(option.body.clone()),
                ..Default::default()
            })
            .exec_without_returning(conn)
            .await?;
        }

        if let Some(scale) = &spec.scale_label {
            scale_label::Entity::insert(scale_label::ActiveModel {
                question_id: Set(question_id),
                scale_label_left: Set(scale.left_label.clone()),
                scale_label_right: Set(scale.right_label.clone()),
                scale_min: Set(scale.min),
                scale_max: Set(scale.max),
            })
            .exec_without_returning(conn)
            .await?;
        }

        if let Some(rule) = &spec.validation {
            validation::Entity::insert(validation::ActiveModel {
                question_id: Set(question_id),
                regex_pattern: Set(rule.regex_pattern.clone()),
                min_bound: Set(rule.min_bound.clone()),
                max_bound: Set(rule.max_bound.clone()),
            })
            .exec_without_returning(conn)
            .await?;
        }
    }
    Ok(())
}

/// Replaces administrator and target rows
async fn replace_members<C: ConnectionTrait>(
    conn: &C,
    questionnaire_id: i64,
    settings: &QuestionnaireSettings,
) -> Result<(), StoreError> {
    administrator::Entity::delete_many()
        .filter(administrator::Column::QuestionnaireId.eq(questionnaire_id))
        .exec(conn)
        .await?;
    target::Entity::delete_many()
        .filter(target::Column::QuestionnaireId.eq(questionnaire_id))
        .exec(conn)
        .await?;

    for user_id in &settings.administrators {
        administrator::Entity::insert(administrator::ActiveModel {
            questionnaire_id: Set(questionnaire_id),
            user_id: Set(user_id.clone()),
            ..Default::default()
        })
        .exec_without_returning(conn)
        .await?;
    }

    for entry in &settings.targets {
        let (kind, reference) = match entry {
            Target::User(user) => (TargetKind::User, user),
            Target::Group(group) => (TargetKind::Group, group),
        };
        target::Entity::insert(target::ActiveModel {
            questionnaire_id: Set(questionnaire_id),
            target_kind: Set(kind),
            target_ref: Set(reference.clone()),
            ..Default::default()
        })
        .exec_without_returning(conn)
        .await?;
    }
    Ok(())
}

/// Loads children of the given questionnaire rows in one query per table
async fn assemble<C: ConnectionTrait>(
    conn: &C,
    headers: Vec<questionnaire::Model>,
) -> Result<Vec<QuestionnaireRecord>, StoreError> {
    let ids: Vec<i64> = headers.iter().map(|h| h.questionnaire_id).collect();

    let questions = question::Entity::find()
        .filter(question::Column::QuestionnaireId.is_in(ids.clone()))
        .filter(Visibility::LiveOnly.condition(question::Column::DeletedAt))
        .order_by_asc(question::Column::PageNum)
        .order_by_asc(question::Column::QuestionNum)
        .all(conn)
        .await?;
    let question_ids: Vec<i64> = questions.iter().map(|q| q.question_id).collect();

    let mut options = group_by(
        question_option::Entity::find()
            .filter(question_option::Column::QuestionId.is_in(question_ids.clone()))
            .order_by_asc(question_option::Column::OptionNum)
            .all(conn)
            .await?,
        |o| o.question_id,
    );
    let mut scales: HashMap<i64, scale_label::Model> = scale_label::Entity::find()
        .filter(scale_label::Column::QuestionId.is_in(question_ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.question_id, s))
        .collect();
    let mut rules: HashMap<i64, validation::Model> = validation::Entity::find()
        .filter(validation::Column::QuestionId.is_in(question_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|v| (v.question_id, v))
        .collect();
    let mut admins = group_by(
        administrator::Entity::find()
            .filter(administrator::Column::QuestionnaireId.is_in(ids.clone()))
            .order_by_asc(administrator::Column::AdministratorId)
            .all(conn)
            .await?,
        |a| a.questionnaire_id,
    );
    let mut targets = group_by(
        target::Entity::find()
            .filter(target::Column::QuestionnaireId.is_in(ids))
            .order_by_asc(target::Column::TargetId)
            .all(conn)
            .await?,
        |t| t.questionnaire_id,
    );
    let mut questions = group_by(questions, |q| q.questionnaire_id);

    let records = headers
        .into_iter()
        .map(|header| {
            let id = header.questionnaire_id;
            let stored_questions = questions
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|q| {
                    let question_id = q.question_id;
                    StoredQuestion {
                        id: question_id,
                        spec: QuestionSpec {
                            options: options
                                .remove(&question_id)
                                .unwrap_or_default()
                                .into_iter()
                                .map(|o| QuestionOption {
                                    option_num: o.option_num,
                                    body: o.body,
                                })
                                .collect(),
                            scale_label: scales.remove(&question_id).map(|s| ScaleLabel {
                                left_label: s.scale_label_left,
                                right_label: s.scale_label_right,
                                min: s.scale_min,
                                max: s.scale_max,
                            }),
                            validation: rules.remove(&question_id).map(|v| ValidationRule {
                                regex_pattern: v.regex_pattern,
                                min_bound: v.min_bound,
                                max_bound: v.max_bound,
                            }),
                            ..QuestionSpec::new(
                                q.page_num,
                                q.question_num,
                                q.question_type,
                                q.body,
                                q.is_required,
                            )
                        },
                    }
                })
                .collect();

            QuestionnaireRecord {
                id,
                settings: QuestionnaireSettings {
                    title: header.title,
                    description: header.description,
                    res_time_limit: header.res_time_limit,
                    res_shared_to: header.res_shared_to,
                    is_anonymous: header.is_anonymous,
                    allow_multiple_responses: header.allow_multiple_responses,
                    resubmission_policy: header.resubmission_policy,
                    administrators: admins
                        .remove(&id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|a| a.user_id)
                        .collect(),
                    targets: targets
                        .remove(&id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|t| match t.target_kind {
                            TargetKind::User => Target::User(t.target_ref),
                            TargetKind::Group => Target::Group(t.target_ref),
                        })
                        .collect(),
                },
                questions: stored_questions,
                created_at: header.created_at,
                modified_at: header.modified_at,
                deleted_at: header.deleted_at,
            }
        })
        .collect();

    Ok(records)
}

async fn load_questionnaire<C: ConnectionTrait>(
    conn: &C,
    questionnaire_id: i64,
    visibility: Visibility,
) -> Result<Option<QuestionnaireRecord>, StoreError> {
    let header = questionnaire::Entity::find_by_id(questionnaire_id)
        .filter(visibility.condition(questionnaire::Column::DeletedAt))
        .one(conn)
        .await?;

    match header {
        Some(header) => Ok(assemble(conn, vec![header]).await?.pop()),
        None => Ok(None),
    }
}

async fn attach_answers<C: ConnectionTrait>(
    conn: &C,
    headers: Vec<respondent::Model>,
) -> Result<Vec<Response>, StoreError> {
    let ids: Vec<i64> = headers.iter().map(|h| h.response_id).collect();
    let mut answers = group_by(
        answer::Entity::find()
            .filter(answer::Column::ResponseId.is_in(ids))
            .order_by_asc(answer::Column::AnswerId)
            .all(conn)
            .await?,
        |a| a.response_id,
    );

    Ok(headers
        .into_iter()
        .map(|header| Response {
            id: Some(header.response_id),
            questionnaire_id: header.questionnaire_id,
            respondent: header.user_id,
            submitted_at: header.submitted_at,
            modified_at: header.modified_at,
            deleted_at: header.deleted_at,
            answers: answers
                .remove(&header.response_id)
                .unwrap_or_default()
                .into_iter()
                .map(|a| Answer {
                    question_id: a.question_id,
                    body: a.body,
                })
                .collect(),
        })
        .collect())
}

async fn insert_answers<C: ConnectionTrait>(
    conn: &C,
    response_id: i64,
    answers: &[Answer],
) -> Result<(), StoreError> {
    if answers.is_empty() {
        return Ok(());
    }
    answer::Entity::insert_many(answers.iter().map(|a| answer::ActiveModel {
        response_id: Set(response_id),
        question_id: Set(a.question_id),
        body: Set(a.body.clone()),
        ..Default::default()
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for SeaOrmStore {
    async fn create_questionnaire(
        &self,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        let settings = &spec.settings;
        let txn = self.db.begin().await?;

        let header = questionnaire::ActiveModel {
            title: Set(settings.title.clone()),
            description: Set(settings.description.clone()),
            res_time_limit: Set(settings.res_time_limit),
            res_shared_to: Set(settings.res_shared_to),
            is_anonymous: Set(settings.is_anonymous),
            allow_multiple_responses: Set(settings.allow_multiple_responses),
            resubmission_policy: Set(settings.resubmission_policy),
            created_at: Set(now),
            modified_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let questionnaire_id = header.questionnaire_id;

        insert_questions(&txn, questionnaire_id, &spec.questions, now).await?;
        replace_members(&txn, questionnaire_id, settings).await?;
        let record = load_questionnaire(&txn, questionnaire_id, Visibility::LiveOnly)
            .await?
            .ok_or(StoreError::NotFound)?;

        txn.commit().await?;
        info!(questionnaire_id, "questionnaire stored");
        Ok(record)
    }

    async fn update_questionnaire(
        &self,
        questionnaire_id: i64,
        spec: &QuestionnaireSpec,
        now: NaiveDateTime,
    ) -> Result<QuestionnaireRecord, StoreError> {
        let settings = &spec.settings;
        let txn = self.db.begin().await?;

        let header = questionnaire::Entity::find_by_id(questionnaire_id)
            .filter(Visibility::LiveOnly.condition(questionnaire::Column::DeletedAt))
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut active: questionnaire::ActiveModel = header.into();
        active.title = Set(settings.title.clone());
        active.description = Set(settings.description.clone());
        active.res_time_limit = Set(settings.res_time_limit);
        active.res_shared_to = Set(settings.res_shared_to);
        active.is_anonymous = Set(settings.is_anonymous);
        active.allow_multiple_responses = Set(settings.allow_multiple_responses);
        active.resubmission_policy = Set(settings.resubmission_policy);
        active.modified_at = Set(now);
        active.update(&txn).await?;

        let retired = question::Entity::update_many()
            .col_expr(question::Column::DeletedAt, Expr::value(Some(now)))
            .filter(question::Column::QuestionnaireId.eq(questionnaire_id))
            .filter(Visibility::LiveOnly.condition(question::Column::DeletedAt))
            .exec(&txn)
            .await?;
        debug!(
            questionnaire_id,
            retired = retired.rows_affected,
            "previous questions soft-deleted"
        );

        insert_questions(&txn, questionnaire_id, &spec.questions, now).await?;
        replace_members(&txn, questionnaire_id, settings).await?;
        let record = load_questionnaire(&txn, questionnaire_id, Visibility::LiveOnly)
            .await?
            .ok_or(StoreError::NotFound)?;

        txn.commit().await?;
        Ok(record)
    }

    async fn soft_delete_questionnaire(
        &self,
        questionnaire_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let result = questionnaire::Entity::update_many()
            .col_expr(questionnaire::Column::DeletedAt, Expr::value(Some(now)))
            .filter(questionnaire::Column::QuestionnaireId.eq(questionnaire_id))
            .filter(Visibility::LiveOnly.condition(questionnaire::Column::DeletedAt))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_questionnaire(
        &self,
        questionnaire_id: i64,
        visibility: Visibility,
    ) -> Result<Option<QuestionnaireRecord>, StoreError> {
        load_questionnaire(&self.db, questionnaire_id, visibility).await
    }

    async fn list_questionnaires(
        &self,
        filter: &QuestionnaireFilter,
    ) -> Result<Vec<QuestionnaireRecord>, StoreError> {
        let mut query = questionnaire::Entity::find()
            .filter(Visibility::LiveOnly.condition(questionnaire::Column::DeletedAt));
        if let Some(pattern) = &filter.title_pattern {
            // MySQL REGEXP is case-insensitive under the default collation
            query = query.filter(Expr::cust_with_values(
                "`questionnaire`.`title` REGEXP ?",
                [pattern.as_str()],
            ));
        }

        let (column, order) = match filter.sort {
            QuestionnaireSort::CreatedAt => (questionnaire::Column::CreatedAt, Order::Asc),
            QuestionnaireSort::CreatedAtDesc => (questionnaire::Column::CreatedAt, Order::Desc),
            QuestionnaireSort::Title => (questionnaire::Column::Title, Order::Asc),
            QuestionnaireSort::TitleDesc => (questionnaire::Column::Title, Order::Desc),
            QuestionnaireSort::ModifiedAt => (questionnaire::Column::ModifiedAt, Order::Asc),
            QuestionnaireSort::ModifiedAtDesc => (questionnaire::Column::ModifiedAt, Order::Desc),
        };
        let headers = query
            .order_by(column, order)
            .order_by_desc(questionnaire::Column::QuestionnaireId)
            .all(&self.db)
            .await?;
        assemble(&self.db, headers).await
    }

    async fn get_response(
        &self,
        response_id: i64,
        visibility: Visibility,
    ) -> Result<Option<Response>, StoreError> {
        let header = respondent::Entity::find_by_id(response_id)
            .filter(visibility.condition(respondent::Column::DeletedAt))
            .one(&self.db)
            .await?;

        match header {
            Some(header) => Ok(attach_answers(&self.db, vec![header]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_live_response(
        &self,
        questionnaire_id: i64,
        user_id: &str,
    ) -> Result<Option<Response>, StoreError> {
        let header = respondent::Entity::find()
            .filter(respondent::Column::QuestionnaireId.eq(questionnaire_id))
            .filter(respondent::Column::UserId.eq(user_id))
            .filter(Visibility::LiveOnly.condition(respondent::Column::DeletedAt))
            .order_by_desc(respondent::Column::ResponseId)
            .one(&self.db)
            .await?;

        match header {
            Some(header) => Ok(attach_answers(&self.db, vec![header]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_responses(&self, questionnaire_id: i64) -> Result<Vec<Response>, StoreError> {
        let headers = respondent::Entity::find()
            .filter(respondent::Column::QuestionnaireId.eq(questionnaire_id))
            .filter(Visibility::LiveOnly.condition(respondent::Column::DeletedAt))
            .order_by_asc(respondent::Column::ResponseId)
            .all(&self.db)
            .await?;
        attach_answers(&self.db, headers).await
    }

    async fn list_responses_by_respondent(
        &self,
        user_id: &str,
    ) -> Result<Vec<Response>, StoreError> {
        let headers = respondent::Entity::find()
            .filter(respondent::Column::UserId.eq(user_id))
            .filter(Visibility::LiveOnly.condition(respondent::Column::DeletedAt))
            .order_by_desc(respondent::Column::ModifiedAt)
            .order_by_desc(respondent::Column::ResponseId)
            .all(&self.db)
            .await?;
        attach_answers(&self.db, headers).await
    }

    async fn create_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        let txn = self.db.begin().await?;

        let header = respondent::ActiveModel {
            questionnaire_id: Set(response.questionnaire_id),
            user_id: Set(response.respondent.clone()),
            live_respondent: Set(live_key.map(String::from)),
            submitted_at: Set(response.submitted_at),
            modified_at: Set(response.modified_at),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_answers(&txn, header.response_id, &response.answers).await?;
        txn.commit().await?;
        Ok(header.response_id)
    }

    async fn update_response(
        &self,
        response: &Response,
        live_key: Option<&str>,
    ) -> Result<(), StoreError> {
        let response_id = response.id.ok_or(StoreError::NotFound)?;
        let txn = self.db.begin().await?;

        let updated = respondent::Entity::update_many()
            .col_expr(
                respondent::Column::SubmittedAt,
                Expr::value(response.submitted_at),
            )
            .col_expr(
                respondent::Column::ModifiedAt,
                Expr::value(response.modified_at),
            )
            .col_expr(
                respondent::Column::LiveRespondent,
                Expr::value(live_key.map(String::from)),
            )
            .filter(respondent::Column::ResponseId.eq(response_id))
            .filter(Visibility::LiveOnly.condition(respondent::Column::DeletedAt))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }

        answer::Entity::delete_many()
            .filter(answer::Column::ResponseId.eq(response_id))
            .exec(&txn)
            .await?;
        insert_answers(&txn, response_id, &response.answers).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn soft_delete_response(
        &self,
        response_id: i64,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let result = respondent::Entity::update_many()
            .col_expr(respondent::Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(
                respondent::Column::LiveRespondent,
                Expr::value(Option::<String>::None),
            )
            .filter(respondent::Column::ResponseId.eq(response_id))
            .filter(Visibility::LiveOnly.condition(respondent::Column::DeletedAt))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
