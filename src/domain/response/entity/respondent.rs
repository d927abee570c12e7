use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Response header row: one respondent's submission to one questionnaire
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "respondent")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub response_id: i64,
    pub questionnaire_id: i64,
    /// Null for anonymous questionnaires
    pub user_id: Option<String>,
    /// Copy of `user_id` while the row is live and single-response applies.
    /// Backs the unique index on (questionnaire_id, live_respondent).
    pub live_respondent: Option<String>,
    /// Null while the response is a draft
    pub submitted_at: Option<DateTime>,
    pub modified_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::domain::questionnaire::entity::questionnaire::Entity",
        from = "Column::QuestionnaireId",
        to = "crate::domain::questionnaire::entity::questionnaire::Column::QuestionnaireId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Questionnaire,
    #[sea_orm(has_many = "super::answer::Entity")]
    Answer,
}

impl Related<crate::domain::questionnaire::entity::questionnaire::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questionnaire.def()
    }
}

impl Related<super::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
