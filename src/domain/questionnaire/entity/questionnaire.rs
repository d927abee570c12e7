use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Who may read aggregated results of a questionnaire
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ResShareType")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResShareType {
    #[sea_orm(string_value = "PUBLIC")]
    Public,
    #[sea_orm(string_value = "RESPONDENTS")]
    Respondents,
    #[sea_orm(string_value = "ADMINISTRATORS")]
    Administrators,
}

/// What happens to `submitted_at` when a respondent submits again
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "ResubmissionPolicy")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResubmissionPolicy {
    #[default]
    #[sea_orm(string_value = "PRESERVE_SUBMITTED_AT")]
    PreserveSubmittedAt,
    #[sea_orm(string_value = "RESET_SUBMITTED_AT")]
    ResetSubmittedAt,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "questionnaire")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub questionnaire_id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub res_time_limit: Option<DateTime>,
    pub res_shared_to: ResShareType,
    pub is_anonymous: bool,
    pub allow_multiple_responses: bool,
    pub resubmission_policy: ResubmissionPolicy,
    pub created_at: DateTime,
    pub modified_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Question,
    #[sea_orm(has_many = "super::administrator::Entity")]
    Administrator,
    #[sea_orm(has_many = "super::target::Entity")]
    Target,
    #[sea_orm(has_many = "crate::domain::response::entity::respondent::Entity")]
    Respondent,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl Related<super::administrator::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Administrator.def()
    }
}

impl Related<super::target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Target.def()
    }
}

impl Related<crate::domain::response::entity::respondent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Respondent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
