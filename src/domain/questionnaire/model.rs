//! Questionnaire aggregate and its question model

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use super::entity::question::QuestionType;
pub use super::entity::questionnaire::{ResShareType, ResubmissionPolicy};
use super::error::QuestionnaireError;
use super::validation::CompiledValidation;

/// Constraints for free-entry questions.
///
/// Bounds are kept as text: character counts for text questions, numeric
/// values for number questions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub regex_pattern: Option<String>,
    pub min_bound: Option<String>,
    pub max_bound: Option<String>,
}

impl ValidationRule {
    /// Empty strings mean "not set"
    pub fn normalized(&self) -> Self {
        fn bound(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        Self {
            regex_pattern: self.regex_pattern.clone().filter(|p| !p.is_empty()),
            min_bound: bound(&self.min_bound),
            max_bound: bound(&self.max_bound),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.regex_pattern.is_none() && self.min_bound.is_none() && self.max_bound.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaleLabel {
    pub left_label: Option<String>,
    pub right_label: Option<String>,
    pub min: Option<i32>,
    pub max: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOption {
    pub option_num: i32,
    pub body: String,
}

impl QuestionOption {
    /// Numbers option bodies from 1 in the given order
    pub fn numbered<I, S>(bodies: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        bodies
            .into_iter()
            .zip(1..)
            .map(|(body, option_num)| Self {
                option_num,
                body: body.into(),
            })
            .collect()
    }
}

/// A question as supplied by an administrator or read back from storage,
/// before its type-specific parts are checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSpec {
    pub page_num: i32,
    pub question_num: i32,
    pub question_type: QuestionType,
    pub body: String,
    pub is_required: bool,
    pub options: Vec<QuestionOption>,
    pub scale_label: Option<ScaleLabel>,
    pub validation: Option<ValidationRule>,
}

impl QuestionSpec {
    pub fn new(
        page_num: i32,
        question_num: i32,
        question_type: QuestionType,
        body: impl Into<String>,
        is_required: bool,
    ) -> Self {
        Self {
            page_num,
            question_num,
            question_type,
            body: body.into(),
            is_required,
            options: Vec::new(),
            scale_label: None,
            validation: None,
        }
    }

    fn check_shape(&self) -> Result<(), QuestionnaireError> {
        if self.page_num < 1 || self.question_num < 1 {
            return Err(QuestionnaireError::InvalidPosition {
                page_num: self.page_num,
                question_num: self.question_num,
            });
        }
        if self.body.trim().is_empty() {
            return Err(QuestionnaireError::EmptyQuestionBody {
                page_num: self.page_num,
                question_num: self.question_num,
            });
        }
        Ok(())
    }
}

/// Type-specific part of a question. Only the parts valid for the type exist.
#[derive(Debug, Clone)]
pub enum QuestionKind {
    Text {
        validation: Option<CompiledValidation>,
    },
    TextArea {
        validation: Option<CompiledValidation>,
    },
    Number {
        validation: Option<CompiledValidation>,
    },
    SingleChoice {
        options: Vec<QuestionOption>,
    },
    MultiChoice {
        options: Vec<QuestionOption>,
    },
    LinearScale {
        scale: ScaleLabel,
    },
}

impl QuestionKind {
    pub fn from_spec(spec: &QuestionSpec) -> Result<Self, QuestionnaireError> {
        let question_type = spec.question_type;
        let mismatch = |attached: &'static str| QuestionnaireError::InvalidQuestionType {
            question_type,
            attached,
        };

        match question_type {
            QuestionType::SingleChoice | QuestionType::MultiChoice => {
                if spec.scale_label.is_some() {
                    return Err(mismatch("a scale label"));
                }
                if spec.validation.is_some() {
                    return Err(mismatch("a validation rule"));
                }
                let options = checked_options(question_type, &spec.options)?;
                Ok(if question_type == QuestionType::SingleChoice {
                    QuestionKind::SingleChoice { options }
                } else {
                    QuestionKind::MultiChoice { options }
                })
            }
            QuestionType::LinearScale => {
                if !spec.options.is_empty() {
                    return Err(mismatch("options"));
                }
                if spec.validation.is_some() {
                    return Err(mismatch("a validation rule"));
                }
                let scale = spec
                    .scale_label
                    .clone()
                    .ok_or(QuestionnaireError::MissingScaleLabel)?;
                if let (Some(min), Some(max)) = (scale.min, scale.max) {
                    if min >= max {
                        return Err(QuestionnaireError::InvalidScaleBounds { min, max });
                    }
                }
                Ok(QuestionKind::LinearScale { scale })
            }
            QuestionType::Text | QuestionType::TextArea | QuestionType::Number => {
                if !spec.options.is_empty() {
                    return Err(mismatch("options"));
                }
                if spec.scale_label.is_some() {
                    return Err(mismatch("a scale label"));
                }
                let validation = match &spec.validation {
                    Some(rule) => CompiledValidation::compile(rule, question_type)?,
                    None => None,
                };
                Ok(match question_type {
                    QuestionType::Text => QuestionKind::Text { validation },
                    QuestionType::TextArea => QuestionKind::TextArea { validation },
                    _ => QuestionKind::Number { validation },
                })
            }
        }
    }
}

fn checked_options(
    question_type: QuestionType,
    options: &[QuestionOption],
) -> Result<Vec<QuestionOption>, QuestionnaireError> {
    if options.is_empty() {
        return Err(QuestionnaireError::EmptyOptions(question_type));
    }

    let mut seen = HashSet::new();
    for option in options {
        if option.option_num < 1 {
            return Err(QuestionnaireError::InvalidOptionNumber(option.option_num));
        }
        if !seen.insert(option.option_num) {
            return Err(QuestionnaireError::DuplicateOptionNumber(option.option_num));
        }
    }

    let mut options = options.to_vec();
    options.sort_by_key(|o| o.option_num);
    Ok(options)
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: i64,
    pub page_num: i32,
    pub question_num: i32,
    pub body: String,
    pub is_required: bool,
    pub kind: QuestionKind,
}

impl Question {
    pub fn new(id: i64, spec: QuestionSpec) -> Result<Self, QuestionnaireError> {
        spec.check_shape()?;
        let kind = QuestionKind::from_spec(&spec)?;

        Ok(Self {
            id,
            page_num: spec.page_num,
            question_num: spec.question_num,
            body: spec.body,
            is_required: spec.is_required,
            kind,
        })
    }

    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::Text { .. } => QuestionType::Text,
            QuestionKind::TextArea { .. } => QuestionType::TextArea,
            QuestionKind::Number { .. } => QuestionType::Number,
            QuestionKind::SingleChoice { .. } => QuestionType::SingleChoice,
            QuestionKind::MultiChoice { .. } => QuestionType::MultiChoice,
            QuestionKind::LinearScale { .. } => QuestionType::LinearScale,
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match &self.kind {
            QuestionKind::SingleChoice { options } | QuestionKind::MultiChoice { options } => {
                options
            }
            _ => &[],
        }
    }

    pub fn scale_label(&self) -> Option<&ScaleLabel> {
        match &self.kind {
            QuestionKind::LinearScale { scale } => Some(scale),
            _ => None,
        }
    }

    pub fn validation_rule(&self) -> Option<&ValidationRule> {
        match &self.kind {
            QuestionKind::Text { validation }
            | QuestionKind::TextArea { validation }
            | QuestionKind::Number { validation } => validation.as_ref().map(|v| v.rule()),
            _ => None,
        }
    }

    pub fn to_spec(&self) -> QuestionSpec {
        QuestionSpec {
            page_num: self.page_num,
            question_num: self.question_num,
            question_type: self.question_type(),
            body: self.body.clone(),
            is_required: self.is_required,
            options: self.options().to_vec(),
            scale_label: self.scale_label().cloned(),
            validation: self.validation_rule().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    User(String),
    Group(String),
}

/// Everything about a questionnaire except its questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireSettings {
    pub title: String,
    pub description: String,
    pub res_time_limit: Option<NaiveDateTime>,
    pub res_shared_to: ResShareType,
    pub is_anonymous: bool,
    pub allow_multiple_responses: bool,
    pub resubmission_policy: ResubmissionPolicy,
    pub administrators: Vec<String>,
    pub targets: Vec<Target>,
}

/// A questionnaire definition as submitted by an administrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireSpec {
    pub settings: QuestionnaireSettings,
    pub questions: Vec<QuestionSpec>,
}

impl QuestionnaireSpec {
    /// Checks everything except the deadline. Used for edits.
    pub fn validate_structure(&self) -> Result<(), QuestionnaireError> {
        check_title(&self.settings.title)?;
        for question in &self.questions {
            question.check_shape()?;
            QuestionKind::from_spec(question)?;
        }
        check_ordinals(self.questions.iter().map(|q| (q.page_num, q.question_num)))
    }

    /// Checks a questionnaire about to be created
    pub fn validate_new(&self, now: NaiveDateTime) -> Result<(), QuestionnaireError> {
        self.validate_structure()?;
        if self.settings.res_time_limit.is_some_and(|limit| limit <= now) {
            return Err(QuestionnaireError::DeadlineInPast);
        }
        Ok(())
    }
}

fn check_title(title: &str) -> Result<(), QuestionnaireError> {
    if title.trim().is_empty() {
        return Err(QuestionnaireError::EmptyTitle);
    }
    Ok(())
}

fn check_ordinals(
    positions: impl Iterator<Item = (i32, i32)>,
) -> Result<(), QuestionnaireError> {
    let mut seen = HashSet::new();
    for (page_num, question_num) in positions {
        if !seen.insert((page_num, question_num)) {
            return Err(QuestionnaireError::DuplicateOrdinal {
                page_num,
                question_num,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuestion {
    pub id: i64,
    pub spec: QuestionSpec,
}

/// A questionnaire as read from storage, live questions only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionnaireRecord {
    pub id: i64,
    pub settings: QuestionnaireSettings,
    pub questions: Vec<StoredQuestion>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Listing order. Ties are broken by id, newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub enum QuestionnaireSort {
    #[serde(rename = "created_at")]
    CreatedAt,
    #[default]
    #[serde(rename = "-created_at")]
    CreatedAtDesc,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "-title")]
    TitleDesc,
    #[serde(rename = "modified_at")]
    ModifiedAt,
    #[serde(rename = "-modified_at")]
    ModifiedAtDesc,
}

/// The columns a listing can be ordered by
#[derive(Debug, Clone, Copy)]
pub struct SortKey<'a> {
    pub id: i64,
    pub title: &'a str,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
}

impl QuestionnaireSort {
    pub fn compare(self, a: &SortKey<'_>, b: &SortKey<'_>) -> Ordering {
        let primary = match self {
            QuestionnaireSort::CreatedAt => a.created_at.cmp(&b.created_at),
            QuestionnaireSort::CreatedAtDesc => b.created_at.cmp(&a.created_at),
            QuestionnaireSort::Title => a.title.cmp(b.title),
            QuestionnaireSort::TitleDesc => b.title.cmp(a.title),
            QuestionnaireSort::ModifiedAt => a.modified_at.cmp(&b.modified_at),
            QuestionnaireSort::ModifiedAtDesc => b.modified_at.cmp(&a.modified_at),
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }
}

impl QuestionnaireRecord {
    pub fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            id: self.id,
            title: &self.settings.title,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }
}

/// How a caller relates to a questionnaire when reading its results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRole {
    Administrator,
    Respondent,
    Other,
}

#[derive(Debug, Clone)]
pub struct Questionnaire {
    pub id: i64,
    pub settings: QuestionnaireSettings,
    /// Ordered by page, then question number
    pub questions: Vec<Question>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Questionnaire {
    /// Rebuilds the aggregate from storage. Broken validation rules surface here.
    pub fn restore(record: QuestionnaireRecord) -> Result<Self, QuestionnaireError> {
        check_title(&record.settings.title)?;
        check_ordinals(
            record
                .questions
                .iter()
                .map(|q| (q.spec.page_num, q.spec.question_num)),
        )?;

        let mut questions = record
            .questions
            .into_iter()
            .map(|q| Question::new(q.id, q.spec))
            .collect::<Result<Vec<_>, _>>()?;
        questions.sort_by_key(|q| (q.page_num, q.question_num));

        Ok(Self {
            id: record.id,
            settings: record.settings,
            questions,
            created_at: record.created_at,
            modified_at: record.modified_at,
            deleted_at: record.deleted_at,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn sort_key(&self) -> SortKey<'_> {
        SortKey {
            id: self.id,
            title: &self.settings.title,
            created_at: self.created_at,
            modified_at: self.modified_at,
        }
    }

    /// Open when live and the deadline, if any, has not passed
    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        !self.is_deleted() && self.settings.res_time_limit.map_or(true, |limit| at <= limit)
    }

    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn is_administrator(&self, identity: &str) -> bool {
        self.settings.administrators.iter().any(|a| a == identity)
    }

    pub fn role_of(&self, identity: &str, has_live_response: bool) -> ViewerRole {
        if self.is_administrator(identity) {
            ViewerRole::Administrator
        } else if has_live_response {
            ViewerRole::Respondent
        } else {
            ViewerRole::Other
        }
    }

    /// Applies the sharing scope. Administrators can always read results.
    pub fn can_view(&self, role: ViewerRole) -> bool {
        match self.settings.res_shared_to {
            ResShareType::Public => true,
            ResShareType::Respondents => {
                matches!(role, ViewerRole::Administrator | ViewerRole::Respondent)
            }
            ResShareType::Administrators => role == ViewerRole::Administrator,
        }
    }

    pub fn target_users(&self) -> impl Iterator<Item = &str> {
        self.settings.targets.iter().filter_map(|t| match t {
            Target::User(user) => Some(user.as_str()),
            Target::Group(_) => None,
        })
    }

    pub fn target_groups(&self) -> impl Iterator<Item = &str> {
        self.settings.targets.iter().filter_map(|t| match t {
            Target::Group(group) => Some(group.as_str()),
            Target::User(_) => None,
        })
    }
}
