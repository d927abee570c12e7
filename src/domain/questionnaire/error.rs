use super::entity::question::QuestionType;

/// Reasons a questionnaire definition is rejected at construction or load time
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionnaireError {
    #[error("questionnaire title must not be empty")]
    EmptyTitle,

    #[error("response deadline must be in the future")]
    DeadlineInPast,

    #[error("question body must not be empty (page {page_num}, question {question_num})")]
    EmptyQuestionBody { page_num: i32, question_num: i32 },

    #[error("page and question numbers start at 1 (page {page_num}, question {question_num})")]
    InvalidPosition { page_num: i32, question_num: i32 },

    #[error("two questions share page {page_num}, question {question_num}")]
    DuplicateOrdinal { page_num: i32, question_num: i32 },

    #[error("{attached} cannot be attached to a {question_type} question")]
    InvalidQuestionType {
        question_type: QuestionType,
        attached: &'static str,
    },

    #[error("a {0} question needs at least one option")]
    EmptyOptions(QuestionType),

    #[error("option numbers start at 1, got {0}")]
    InvalidOptionNumber(i32),

    #[error("option number {0} is used twice")]
    DuplicateOptionNumber(i32),

    #[error("a linear scale question needs a scale label")]
    MissingScaleLabel,

    #[error("scale minimum {min} must be less than maximum {max}")]
    InvalidScaleBounds { min: i32, max: i32 },

    #[error("invalid regex pattern `{pattern}`: {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("invalid validation bound `{0}`")]
    InvalidBound(String),
}
