use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "QuestionType")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    /// Single-line free text
    #[sea_orm(string_value = "TEXT")]
    Text,
    /// Multi-line free text
    #[sea_orm(string_value = "TEXT_AREA")]
    TextArea,
    /// Free numeric entry
    #[sea_orm(string_value = "NUMBER")]
    Number,
    #[sea_orm(string_value = "SINGLE_CHOICE")]
    SingleChoice,
    #[sea_orm(string_value = "MULTI_CHOICE")]
    MultiChoice,
    /// Integer scale bounded by its scale label
    #[sea_orm(string_value = "LINEAR_SCALE")]
    LinearScale,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "TEXT",
            QuestionType::TextArea => "TEXT_AREA",
            QuestionType::Number => "NUMBER",
            QuestionType::SingleChoice => "SINGLE_CHOICE",
            QuestionType::MultiChoice => "MULTI_CHOICE",
            QuestionType::LinearScale => "LINEAR_SCALE",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }

    /// Types that accept a validation rule
    pub fn is_free_entry(&self) -> bool {
        matches!(
            self,
            QuestionType::Text | QuestionType::TextArea | QuestionType::Number
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "question")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub question_id: i64,
    pub questionnaire_id: i64,
    pub page_num: i32,
    pub question_num: i32,
    pub question_type: QuestionType,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    pub is_required: bool,
    pub created_at: DateTime,
    pub deleted_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::questionnaire::Entity",
        from = "Column::QuestionnaireId",
        to = "super::questionnaire::Column::QuestionnaireId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Questionnaire,
    #[sea_orm(has_many = "super::question_option::Entity")]
    QuestionOption,
    #[sea_orm(has_one = "super::scale_label::Entity")]
    ScaleLabel,
    #[sea_orm(has_one = "super::validation::Entity")]
    Validation,
    #[sea_orm(has_many = "crate::domain::response::entity::answer::Entity")]
    Answer,
}

impl Related<super::questionnaire::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questionnaire.def()
    }
}

impl Related<super::question_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestionOption.def()
    }
}

impl Related<super::scale_label::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScaleLabel.def()
    }
}

impl Related<super::validation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Validation.def()
    }
}

impl Related<crate::domain::response::entity::answer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
