use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "answer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub answer_id: i64,
    pub response_id: i64,
    pub question_id: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub body: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::respondent::Entity",
        from = "Column::ResponseId",
        to = "super::respondent::Column::ResponseId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Respondent,
    #[sea_orm(
        belongs_to = "crate::domain::questionnaire::entity::question::Entity",
        from = "Column::QuestionId",
        to = "crate::domain::questionnaire::entity::question::Column::QuestionId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Question,
}

impl Related<super::respondent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Respondent.def()
    }
}

impl Related<crate::domain::questionnaire::entity::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Question.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
