use crate::domain::questionnaire::validation::ValidationReason;

/// Reasons a submission or withdrawal is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    #[error("the questionnaire is closed")]
    QuestionnaireClosed,

    #[error("question {0} does not belong to this questionnaire")]
    UnknownQuestion(i64),

    #[error("answer to question {question_id} was rejected: {reason}")]
    ValidationFailed {
        question_id: i64,
        reason: ValidationReason,
    },

    #[error("the response has already been withdrawn")]
    AlreadyDeleted,

    #[error("a submitted response cannot be saved as a draft")]
    AlreadySubmitted,
}
