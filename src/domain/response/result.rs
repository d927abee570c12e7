//! Per-question result aggregation

use serde::Serialize;
use utoipa::ToSchema;

use super::model::Response;
use crate::domain::questionnaire::model::{Question, QuestionKind, Questionnaire};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_num: i32,
    pub body: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuestionSummary {
    /// Answer bodies in submission order
    Text { answers: Vec<String> },
    /// Every option, including ones nobody picked
    Choice { options: Vec<OptionCount> },
    Scale {
        count: usize,
        mean: Option<f64>,
        values: Vec<i64>,
        unanswered: usize,
    },
    Number {
        count: usize,
        mean: Option<f64>,
        values: Vec<f64>,
        unanswered: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: i64,
    pub page_num: i32,
    pub question_num: i32,
    pub body: String,
    pub summary: QuestionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResult {
    pub questionnaire_id: i64,
    pub response_count: usize,
    pub questions: Vec<QuestionResult>,
}

/// Summarizes the live, submitted responses of `questionnaire`.
///
/// Responses are read in submission order, ties broken by id. The input is
/// never modified.
pub fn aggregate(questionnaire: &Questionnaire, responses: &[Response]) -> QuestionnaireResult {
    let mut counted: Vec<&Response> = responses
        .iter()
        .filter(|r| r.questionnaire_id == questionnaire.id && !r.is_deleted() && r.is_submitted())
        .collect();
    counted.sort_by_key(|r| (r.submitted_at, r.id));

    QuestionnaireResult {
        questionnaire_id: questionnaire.id,
        response_count: counted.len(),
        questions: questionnaire
            .questions
            .iter()
            .map(|question| QuestionResult {
                question_id: question.id,
                page_num: question.page_num,
                question_num: question.question_num,
                body: question.body.clone(),
                summary: summarize(question, &counted),
            })
            .collect(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// First parsable value each response gave, plus how many gave none
fn collect_values<T>(
    question: &Question,
    responses: &[&Response],
    parse: impl Fn(&str) -> Option<T>,
) -> (Vec<T>, usize) {
    let mut values = Vec::new();
    let mut unanswered = 0;
    for response in responses {
        match response.bodies_for(question.id).find_map(|b| parse(b.trim())) {
            Some(value) => values.push(value),
            None => unanswered += 1,
        }
    }
    (values, unanswered)
}

fn summarize(question: &Question, responses: &[&Response]) -> QuestionSummary {
    match &question.kind {
        QuestionKind::Text { .. } | QuestionKind::TextArea { .. } => QuestionSummary::Text {
            answers: responses
                .iter()
                .flat_map(|r| r.bodies_for(question.id))
                .map(String::from)
                .collect(),
        },
        QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
            QuestionSummary::Choice {
                options: options
                    .iter()
                    .map(|option| OptionCount {
                        option_num: option.option_num,
                        body: option.body.clone(),
                        count: responses
                            .iter()
                            .filter(|r| r.bodies_for(question.id).any(|b| b == option.body))
                            .count(),
                    })
                    .collect(),
            }
        }
        QuestionKind::LinearScale { .. } => {
            let (values, unanswered) =
                collect_values(question, responses, |b| b.parse::<i64>().ok());
            let as_float: Vec<f64> = values.iter().map(|v| *v as f64).collect();
            QuestionSummary::Scale {
                count: values.len(),
                mean: mean(&as_float),
                values,
                unanswered,
            }
        }
        QuestionKind::Number { .. } => {
            let (values, unanswered) = collect_values(question, responses, |b| {
                b.parse::<f64>().ok().filter(|v| v.is_finite())
            });
            QuestionSummary::Number {
                count: values.len(),
                mean: mean(&values),
                values,
                unanswered,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::questionnaire::model::{
        QuestionOption, QuestionSpec, QuestionType, QuestionnaireRecord, QuestionnaireSettings,
        ResShareType, ResubmissionPolicy, ScaleLabel, StoredQuestion,
    };
    use crate::domain::response::model::Answer;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn questionnaire() -> Questionnaire {
        let question = |id, spec| StoredQuestion { id, spec };
        Questionnaire::restore(QuestionnaireRecord {
            id: 1,
            settings: QuestionnaireSettings {
                title: "회고".to_string(),
                description: String::new(),
                res_time_limit: None,
                res_shared_to: ResShareType::Public,
                is_anonymous: false,
                allow_multiple_responses: false,
                resubmission_policy: ResubmissionPolicy::default(),
                administrators: vec!["admin".to_string()],
                targets: vec![],
            },
            questions: vec![
                question(
                    1,
                    QuestionSpec {
                        scale_label: Some(ScaleLabel {
                            left_label: None,
                            right_label: None,
                            min: Some(1),
                            max: Some(5),
                        }),
                        ..QuestionSpec::new(1, 1, QuestionType::LinearScale, "만족도", false)
                    },
                ),
                question(
                    2,
                    QuestionSpec::new(1, 2, QuestionType::TextArea, "한마디", false),
                ),
                question(
                    3,
                    QuestionSpec {
                        options: QuestionOption::numbered(["Keep", "Problem", "Try"]),
                        ..QuestionSpec::new(1, 3, QuestionType::MultiChoice, "분류", false)
                    },
                ),
                question(
                    4,
                    QuestionSpec::new(1, 4, QuestionType::Number, "시간", false),
                ),
            ],
            created_at: at(0),
            modified_at: at(0),
            deleted_at: None,
        })
        .unwrap()
    }

    fn response(id: i64, submitted: Option<i64>, answers: Vec<Answer>) -> Response {
        Response {
            id: Some(id),
            questionnaire_id: 1,
            respondent: Some(format!("user{}", id)),
            submitted_at: submitted.map(at),
            modified_at: at(0),
            deleted_at: None,
            answers,
        }
    }

    fn summary(result: &QuestionnaireResult, question_id: i64) -> &QuestionSummary {
        &result
            .questions
            .iter()
            .find(|q| q.question_id == question_id)
            .unwrap()
            .summary
    }

    #[test]
    fn should_report_single_scale_answer() {
        // Arrange
        let responses = vec![response(1, Some(1), vec![Answer::new(1, "3")])];

        // Act
        let result = aggregate(&questionnaire(), &responses);

        // Assert
        assert_eq!(result.response_count, 1);
        assert_eq!(
            summary(&result, 1),
            &QuestionSummary::Scale {
                count: 1,
                mean: Some(3.0),
                values: vec![3],
                unanswered: 0,
            }
        );
    }

    #[test]
    fn should_order_text_by_submission_then_id() {
        // Arrange: same submission time for 3 and 2, earlier for 5
        let responses = vec![
            response(3, Some(10), vec![Answer::new(2, "third")]),
            response(2, Some(10), vec![Answer::new(2, "second")]),
            response(5, Some(1), vec![Answer::new(2, "first")]),
        ];

        // Act
        let result = aggregate(&questionnaire(), &responses);

        // Assert
        assert_eq!(
            summary(&result, 2),
            &QuestionSummary::Text {
                answers: vec!["first".into(), "second".into(), "third".into()]
            }
        );
    }

    #[test]
    fn should_count_every_option_including_unpicked() {
        let responses = vec![
            response(1, Some(1), vec![Answer::new(3, "Keep"), Answer::new(3, "Try")]),
            response(2, Some(2), vec![Answer::new(3, "Keep")]),
        ];

        let result = aggregate(&questionnaire(), &responses);

        let counts: Vec<(&str, usize)> = match summary(&result, 3) {
            QuestionSummary::Choice { options } => {
                options.iter().map(|o| (o.body.as_str(), o.count)).collect()
            }
            other => panic!("unexpected summary {:?}", other),
        };
        assert_eq!(counts, vec![("Keep", 2), ("Problem", 0), ("Try", 1)]);
    }

    #[test]
    fn should_skip_withdrawn_and_draft_responses() {
        // Arrange
        let mut withdrawn = response(1, Some(1), vec![Answer::new(1, "5")]);
        withdrawn.deleted_at = Some(at(2));
        let draft = response(2, None, vec![Answer::new(1, "1")]);
        let live = response(3, Some(3), vec![Answer::new(1, "4")]);

        // Act
        let result = aggregate(&questionnaire(), &[withdrawn, draft, live]);

        // Assert
        assert_eq!(result.response_count, 1);
        assert!(matches!(
            summary(&result, 1),
            QuestionSummary::Scale { count: 1, .. }
        ));
    }

    #[test]
    fn should_count_missing_and_non_numeric_as_unanswered() {
        let responses = vec![
            response(1, Some(1), vec![Answer::new(4, "1.5")]),
            response(2, Some(2), vec![Answer::new(4, "abc")]),
            response(3, Some(3), vec![]),
            response(4, Some(4), vec![Answer::new(4, "2.5")]),
        ];

        let result = aggregate(&questionnaire(), &responses);

        assert_eq!(
            summary(&result, 4),
            &QuestionSummary::Number {
                count: 2,
                mean: Some(2.0),
                values: vec![1.5, 2.5],
                unanswered: 2,
            }
        );
        assert!(matches!(
            summary(&result, 1),
            QuestionSummary::Scale {
                count: 0,
                mean: None,
                unanswered: 4,
                ..
            }
        ));
    }

    #[test]
    fn should_produce_identical_output_on_rerun() {
        // Arrange
        let questionnaire = questionnaire();
        let responses = vec![
            response(1, Some(2), vec![Answer::new(1, "2"), Answer::new(2, "a")]),
            response(2, Some(1), vec![Answer::new(1, "5"), Answer::new(3, "Problem")]),
        ];
        let snapshot = responses.clone();

        // Act
        let first = serde_json::to_vec(&aggregate(&questionnaire, &responses)).unwrap();
        let second = serde_json::to_vec(&aggregate(&questionnaire, &responses)).unwrap();

        // Assert
        assert_eq!(first, second);
        assert_eq!(responses, snapshot);
    }
}
