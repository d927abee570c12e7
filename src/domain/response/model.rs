//! Response aggregate: one respondent's answers to one questionnaire

use chrono::NaiveDateTime;

use super::error::ResponseError;
use crate::domain::questionnaire::model::{Questionnaire, ResubmissionPolicy};
use crate::domain::questionnaire::validation::validate_answer;

/// One answer body. Multi-choice questions get one `Answer` per selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_id: i64,
    pub body: Option<String>,
}

impl Answer {
    pub fn new(question_id: i64, body: impl Into<String>) -> Self {
        Self {
            question_id,
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    /// Required questions are enforced and `submitted_at` is set
    Final,
    /// Saved for later. Required questions may still be empty.
    Draft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// `None` until the response has been stored
    pub id: Option<i64>,
    pub questionnaire_id: i64,
    /// `None` for anonymous questionnaires
    pub respondent: Option<String>,
    /// `None` while the response is a draft
    pub submitted_at: Option<NaiveDateTime>,
    pub modified_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
    pub answers: Vec<Answer>,
}

impl Response {
    /// Validates `answers` against `questionnaire` and produces the response
    /// to store.
    ///
    /// `existing` is the caller's live response when one was found; it is
    /// overwritten in place and keeps its id. Nothing is produced when any
    /// answer is rejected.
    pub fn submit(
        questionnaire: &Questionnaire,
        existing: Option<Response>,
        answers: Vec<Answer>,
        submitter: Option<&str>,
        kind: SubmissionKind,
        now: NaiveDateTime,
    ) -> Result<Response, ResponseError> {
        if !questionnaire.is_open_at(now) {
            return Err(ResponseError::QuestionnaireClosed);
        }

        if let Some(unknown) = answers
            .iter()
            .find(|a| questionnaire.question(a.question_id).is_none())
        {
            return Err(ResponseError::UnknownQuestion(unknown.question_id));
        }

        let enforce_required = kind == SubmissionKind::Final;
        let mut ordered = Vec::with_capacity(answers.len());
        for question in &questionnaire.questions {
            let given: Vec<&Answer> = answers
                .iter()
                .filter(|a| a.question_id == question.id)
                .collect();
            let bodies: Vec<&str> = given.iter().filter_map(|a| a.body.as_deref()).collect();

            validate_answer(question, &bodies, enforce_required).map_err(|reason| {
                ResponseError::ValidationFailed {
                    question_id: question.id,
                    reason,
                }
            })?;

            ordered.extend(
                given
                    .into_iter()
                    .filter(|a| a.body.as_deref().is_some_and(|b| !b.trim().is_empty()))
                    .cloned(),
            );
        }

        match existing {
            Some(previous) => previous.overwrite(questionnaire, ordered, kind, now),
            None => {
                let respondent = if questionnaire.settings.is_anonymous {
                    None
                } else {
                    submitter.map(String::from)
                };
                Ok(Response {
                    id: None,
                    questionnaire_id: questionnaire.id,
                    respondent,
                    submitted_at: (kind == SubmissionKind::Final).then_some(now),
                    modified_at: now,
                    deleted_at: None,
                    answers: ordered,
                })
            }
        }
    }

    fn overwrite(
        mut self,
        questionnaire: &Questionnaire,
        answers: Vec<Answer>,
        kind: SubmissionKind,
        now: NaiveDateTime,
    ) -> Result<Response, ResponseError> {
        if self.is_deleted() {
            return Err(ResponseError::AlreadyDeleted);
        }

        self.submitted_at = match (kind, self.submitted_at) {
            (SubmissionKind::Draft, Some(_)) => return Err(ResponseError::AlreadySubmitted),
            (SubmissionKind::Draft, None) => None,
            (SubmissionKind::Final, None) => Some(now),
            (SubmissionKind::Final, Some(first)) => {
                match questionnaire.settings.resubmission_policy {
                    ResubmissionPolicy::PreserveSubmittedAt => Some(first),
                    ResubmissionPolicy::ResetSubmittedAt => Some(now),
                }
            }
        };
        self.modified_at = now;
        self.answers = answers;
        Ok(self)
    }

    /// Soft-deletes the response
    pub fn withdraw(&mut self, now: NaiveDateTime) -> Result<(), ResponseError> {
        if self.is_deleted() {
            return Err(ResponseError::AlreadyDeleted);
        }
        self.deleted_at = Some(now);
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted_at.is_some()
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.respondent.as_deref() == Some(identity)
    }

    /// Value of the live-response uniqueness key.
    ///
    /// Only set while the response is live and the questionnaire limits each
    /// respondent to one response.
    pub fn live_key(&self, questionnaire: &Questionnaire) -> Option<String> {
        if self.is_deleted() || questionnaire.settings.allow_multiple_responses {
            return None;
        }
        self.respondent.clone()
    }

    /// Non-blank answer bodies given for `question_id`, in stored order
    pub fn bodies_for(&self, question_id: i64) -> impl Iterator<Item = &str> {
        self.answers
            .iter()
            .filter(move |a| a.question_id == question_id)
            .filter_map(|a| a.body.as_deref())
            .filter(|b| !b.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::questionnaire::model::{
        QuestionOption, QuestionSpec, QuestionType, QuestionnaireRecord, QuestionnaireSettings,
        ResShareType, ScaleLabel, StoredQuestion, Target, ValidationRule,
    };
    use crate::domain::questionnaire::validation::ValidationReason;
    use chrono::{Duration, NaiveDate};

    const SCALE: i64 = 1;
    const NAME: i64 = 2;
    const LUNCH: i64 = 3;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 4, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn scale_question() -> StoredQuestion {
        StoredQuestion {
            id: SCALE,
            spec: QuestionSpec {
                scale_label: Some(ScaleLabel {
                    left_label: None,
                    right_label: None,
                    min: Some(1),
                    max: Some(5),
                }),
                ..QuestionSpec::new(1, 1, QuestionType::LinearScale, "만족도", true)
            },
        }
    }

    fn questionnaire_with(questions: Vec<StoredQuestion>) -> Questionnaire {
        Questionnaire::restore(QuestionnaireRecord {
            id: 10,
            settings: QuestionnaireSettings {
                title: "설문".to_string(),
                description: String::new(),
                res_time_limit: Some(now() + Duration::days(1)),
                res_shared_to: ResShareType::Respondents,
                is_anonymous: false,
                allow_multiple_responses: false,
                resubmission_policy: ResubmissionPolicy::PreserveSubmittedAt,
                administrators: vec!["admin".to_string()],
                targets: vec![Target::User("alice".to_string())],
            },
            questions,
            created_at: now() - Duration::days(1),
            modified_at: now() - Duration::days(1),
            deleted_at: None,
        })
        .unwrap()
    }

    fn survey() -> Questionnaire {
        questionnaire_with(vec![
            scale_question(),
            StoredQuestion {
                id: NAME,
                spec: QuestionSpec {
                    validation: Some(ValidationRule {
                        regex_pattern: Some("[a-z]+".to_string()),
                        ..Default::default()
                    }),
                    ..QuestionSpec::new(1, 2, QuestionType::Text, "닉네임", false)
                },
            },
            StoredQuestion {
                id: LUNCH,
                spec: QuestionSpec {
                    options: QuestionOption::numbered(["김밥", "라멘", "샐러드"]),
                    ..QuestionSpec::new(2, 1, QuestionType::MultiChoice, "점심", false)
                },
            },
        ])
    }

    fn submit(
        questionnaire: &Questionnaire,
        existing: Option<Response>,
        answers: Vec<Answer>,
        kind: SubmissionKind,
        at: NaiveDateTime,
    ) -> Result<Response, ResponseError> {
        Response::submit(questionnaire, existing, answers, Some("alice"), kind, at)
    }

    #[test]
    fn should_submit_scale_answer_in_range() {
        // Arrange
        let questionnaire = questionnaire_with(vec![scale_question()]);

        // Act
        let response = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();

        // Assert
        assert_eq!(response.submitted_at, Some(now()));
        assert_eq!(response.respondent.as_deref(), Some("alice"));
        assert_eq!(response.answers, vec![Answer::new(SCALE, "3")]);
    }

    #[test]
    fn should_reject_out_of_range_with_question_id() {
        let questionnaire = questionnaire_with(vec![scale_question()]);

        let result = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "6")],
            SubmissionKind::Final,
            now(),
        );

        assert_eq!(
            result,
            Err(ResponseError::ValidationFailed {
                question_id: SCALE,
                reason: ValidationReason::OutOfRange {
                    value: "6".to_string()
                },
            })
        );
    }

    #[test]
    fn should_reject_whole_submission_when_one_answer_is_invalid() {
        // Arrange: valid scale and choices, invalid nickname
        let questionnaire = survey();
        let answers = vec![
            Answer::new(SCALE, "4"),
            Answer::new(NAME, "Not Lowercase"),
            Answer::new(LUNCH, "김밥"),
            Answer::new(LUNCH, "라멘"),
        ];

        // Act
        let result = submit(&questionnaire, None, answers, SubmissionKind::Final, now());

        // Assert
        assert!(matches!(
            result,
            Err(ResponseError::ValidationFailed {
                question_id: NAME,
                reason: ValidationReason::PatternMismatch { .. }
            })
        ));
    }

    #[test]
    fn should_treat_missing_required_answer_as_empty() {
        let questionnaire = survey();

        let result = submit(
            &questionnaire,
            None,
            vec![Answer::new(NAME, "alice")],
            SubmissionKind::Final,
            now(),
        );

        assert_eq!(
            result,
            Err(ResponseError::ValidationFailed {
                question_id: SCALE,
                reason: ValidationReason::RequiredFieldMissing,
            })
        );
    }

    #[test]
    fn should_not_store_blank_answers() {
        // Arrange
        let questionnaire = survey();

        // Act
        let response = submit(
            &questionnaire,
            None,
            vec![
                Answer::new(SCALE, "4"),
                Answer::new(NAME, "   "),
                Answer::new(LUNCH, ""),
                Answer::new(LUNCH, "라멘"),
            ],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();

        // Assert
        assert_eq!(
            response.answers,
            vec![Answer::new(SCALE, "4"), Answer::new(LUNCH, "라멘")]
        );
    }

    #[test]
    fn should_reject_answer_to_foreign_question() {
        let questionnaire = survey();

        let result = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3"), Answer::new(99, "?")],
            SubmissionKind::Final,
            now(),
        );

        assert_eq!(result, Err(ResponseError::UnknownQuestion(99)));
    }

    #[test]
    fn should_refuse_submission_after_deadline() {
        let questionnaire = survey();
        let late = now() + Duration::days(2);

        let result = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            late,
        );

        assert_eq!(result, Err(ResponseError::QuestionnaireClosed));
    }

    #[test]
    fn should_discard_identity_on_anonymous_questionnaire() {
        let mut questionnaire = survey();
        questionnaire.settings.is_anonymous = true;

        let response = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();

        assert_eq!(response.respondent, None);
        assert_eq!(response.live_key(&questionnaire), None);
    }

    #[test]
    fn should_keep_answers_and_submitted_at_on_identical_resubmission() {
        // Arrange
        let questionnaire = survey();
        let answers = vec![Answer::new(SCALE, "5"), Answer::new(LUNCH, "라멘")];
        let mut first = submit(
            &questionnaire,
            None,
            answers.clone(),
            SubmissionKind::Final,
            now(),
        )
        .unwrap();
        first.id = Some(7);
        let later = now() + Duration::hours(1);

        // Act
        let second = submit(
            &questionnaire,
            Some(first.clone()),
            answers,
            SubmissionKind::Final,
            later,
        )
        .unwrap();

        // Assert
        assert_eq!(second.id, Some(7));
        assert_eq!(second.submitted_at, first.submitted_at);
        assert_eq!(second.answers, first.answers);
        assert_eq!(second.modified_at, later);
    }

    #[test]
    fn should_reset_submitted_at_when_policy_says_so() {
        let mut questionnaire = survey();
        questionnaire.settings.resubmission_policy = ResubmissionPolicy::ResetSubmittedAt;
        let first = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "5")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();
        let later = now() + Duration::hours(1);

        let second = submit(
            &questionnaire,
            Some(first),
            vec![Answer::new(SCALE, "2")],
            SubmissionKind::Final,
            later,
        )
        .unwrap();

        assert_eq!(second.submitted_at, Some(later));
        assert_eq!(second.answers, vec![Answer::new(SCALE, "2")]);
    }

    #[test]
    fn should_save_draft_without_required_answers() {
        let questionnaire = survey();

        let draft = submit(
            &questionnaire,
            None,
            vec![Answer::new(NAME, "alice")],
            SubmissionKind::Draft,
            now(),
        )
        .unwrap();

        assert!(!draft.is_submitted());
    }

    #[test]
    fn should_still_check_format_of_draft_answers() {
        let questionnaire = survey();

        let result = submit(
            &questionnaire,
            None,
            vec![Answer::new(LUNCH, "피자")],
            SubmissionKind::Draft,
            now(),
        );

        assert!(matches!(
            result,
            Err(ResponseError::ValidationFailed {
                question_id: LUNCH,
                reason: ValidationReason::UnknownOption { .. }
            })
        ));
    }

    #[test]
    fn should_set_submitted_at_when_draft_is_finalized() {
        let questionnaire = survey();
        let draft = submit(&questionnaire, None, vec![], SubmissionKind::Draft, now()).unwrap();
        let later = now() + Duration::minutes(5);

        let response = submit(
            &questionnaire,
            Some(draft),
            vec![Answer::new(SCALE, "1")],
            SubmissionKind::Final,
            later,
        )
        .unwrap();

        assert_eq!(response.submitted_at, Some(later));
    }

    #[test]
    fn should_not_turn_submitted_response_back_into_draft() {
        let questionnaire = survey();
        let submitted = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "1")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();

        let result = submit(
            &questionnaire,
            Some(submitted),
            vec![],
            SubmissionKind::Draft,
            now(),
        );

        assert_eq!(result, Err(ResponseError::AlreadySubmitted));
    }

    #[test]
    fn should_withdraw_once() {
        // Arrange
        let questionnaire = survey();
        let mut response = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();
        assert_eq!(response.live_key(&questionnaire).as_deref(), Some("alice"));

        // Act
        let first = response.withdraw(now());
        let second = response.withdraw(now());

        // Assert
        assert_eq!(first, Ok(()));
        assert_eq!(second, Err(ResponseError::AlreadyDeleted));
        assert_eq!(response.live_key(&questionnaire), None);
    }

    #[test]
    fn should_not_overwrite_withdrawn_response() {
        let questionnaire = survey();
        let mut response = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();
        response.withdraw(now()).unwrap();

        let result = submit(
            &questionnaire,
            Some(response),
            vec![Answer::new(SCALE, "4")],
            SubmissionKind::Final,
            now(),
        );

        assert_eq!(result, Err(ResponseError::AlreadyDeleted));
    }

    #[test]
    fn should_have_no_live_key_when_multiple_responses_allowed() {
        let mut questionnaire = survey();
        questionnaire.settings.allow_multiple_responses = true;

        let response = submit(
            &questionnaire,
            None,
            vec![Answer::new(SCALE, "3")],
            SubmissionKind::Final,
            now(),
        )
        .unwrap();

        assert_eq!(response.live_key(&questionnaire), None);
        assert_eq!(response.respondent.as_deref(), Some("alice"));
    }
}
