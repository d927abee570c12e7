//! Answer validation
//!
//! Pure checks of the answer bodies given for one question against the
//! constraints the question carries. Nothing here touches storage.

use std::str::FromStr;

use regex::Regex;
use serde::Serialize;

use super::entity::question::QuestionType;
use super::error::QuestionnaireError;
use super::model::{Question, QuestionKind, QuestionOption, ValidationRule};

/// Why a single answer was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    #[error("an answer is required")]
    RequiredFieldMissing,

    #[error("`{value}` does not match the pattern `{pattern}`")]
    PatternMismatch { pattern: String, value: String },

    #[error("`{value}` is not a number")]
    NotANumber { value: String },

    #[error("`{value}` is out of range")]
    OutOfRange { value: String },

    #[error("answer length {length} is out of range")]
    LengthOutOfRange { length: usize },

    #[error("`{value}` is not one of the options")]
    UnknownOption { value: String },

    #[error("{count} answers given where only one is allowed")]
    TooManySelections { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Bounds {
    /// Character count bounds for text questions
    Length { min: Option<usize>, max: Option<usize> },
    /// Value bounds for number questions
    Numeric { min: Option<f64>, max: Option<f64> },
}

/// A validation rule whose pattern and bounds were checked once at load time
#[derive(Debug, Clone)]
pub struct CompiledValidation {
    rule: ValidationRule,
    pattern: Option<Regex>,
    bounds: Bounds,
}

impl CompiledValidation {
    /// Compiles `rule` for a question of `question_type`.
    ///
    /// A rule with neither pattern nor bounds is a no-op and yields `None`.
    pub fn compile(
        rule: &ValidationRule,
        question_type: QuestionType,
    ) -> Result<Option<Self>, QuestionnaireError> {
        let rule = rule.normalized();
        if rule.is_noop() {
            return Ok(None);
        }

        let pattern = rule
            .regex_pattern
            .as_deref()
            .map(|p| {
                // The whole answer has to match, not a substring of it
                Regex::new(&format!("^(?:{})$", p)).map_err(|e| QuestionnaireError::InvalidRegex {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let bounds = if question_type == QuestionType::Number {
            let min = parse_bound::<f64>(rule.min_bound.as_deref())?;
            let max = parse_bound::<f64>(rule.max_bound.as_deref())?;
            for bound in [min, max].into_iter().flatten() {
                if !bound.is_finite() {
                    return Err(QuestionnaireError::InvalidBound(bound.to_string()));
                }
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(QuestionnaireError::InvalidBound(format!("{} > {}", min, max)));
                }
            }
            Bounds::Numeric { min, max }
        } else {
            let min = parse_bound::<usize>(rule.min_bound.as_deref())?;
            let max = parse_bound::<usize>(rule.max_bound.as_deref())?;
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(QuestionnaireError::InvalidBound(format!("{} > {}", min, max)));
                }
            }
            Bounds::Length { min, max }
        };

        Ok(Some(Self {
            rule,
            pattern,
            bounds,
        }))
    }

    pub fn rule(&self) -> &ValidationRule {
        &self.rule
    }

    fn check(&self, value: &str) -> Result<(), ValidationReason> {
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(ValidationReason::PatternMismatch {
                    pattern: self.rule.regex_pattern.clone().unwrap_or_default(),
                    value: value.to_string(),
                });
            }
        }

        match self.bounds {
            Bounds::Length { min, max } => {
                let length = value.chars().count();
                if min.is_some_and(|min| length < min) || max.is_some_and(|max| length > max) {
                    return Err(ValidationReason::LengthOutOfRange { length });
                }
            }
            Bounds::Numeric { min, max } => {
                let number = parse_number(value)?;
                if min.is_some_and(|min| number < min) || max.is_some_and(|max| number > max) {
                    return Err(ValidationReason::OutOfRange {
                        value: value.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn parse_bound<T: FromStr>(bound: Option<&str>) -> Result<Option<T>, QuestionnaireError> {
    bound
        .map(|b| {
            b.trim()
                .parse::<T>()
                .map_err(|_| QuestionnaireError::InvalidBound(b.to_string()))
        })
        .transpose()
}

fn parse_number(value: &str) -> Result<f64, ValidationReason> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ValidationReason::NotANumber {
            value: value.to_string(),
        })
}

fn single<'a>(given: &[&'a str]) -> Result<&'a str, ValidationReason> {
    match given {
        [value] => Ok(value),
        _ => Err(ValidationReason::TooManySelections { count: given.len() }),
    }
}

fn check_option(options: &[QuestionOption], value: &str) -> Result<(), ValidationReason> {
    if options.iter().any(|o| o.body == value) {
        Ok(())
    } else {
        Err(ValidationReason::UnknownOption {
            value: value.to_string(),
        })
    }
}

/// Validates the answer bodies given for `question`.
///
/// Blank bodies count as absent. With `enforce_required` off (drafts) a
/// missing answer to a required question is accepted, but whatever was
/// answered must still be well-formed.
pub fn validate_answer(
    question: &Question,
    bodies: &[&str],
    enforce_required: bool,
) -> Result<(), ValidationReason> {
    let given: Vec<&str> = bodies
        .iter()
        .copied()
        .filter(|b| !b.trim().is_empty())
        .collect();

    if given.is_empty() {
        if question.is_required && enforce_required {
            return Err(ValidationReason::RequiredFieldMissing);
        }
        return Ok(());
    }

    match &question.kind {
        QuestionKind::Text { validation } | QuestionKind::TextArea { validation } => {
            let value = single(&given)?;
            match validation {
                Some(validation) => validation.check(value),
                None => Ok(()),
            }
        }
        QuestionKind::Number { validation } => {
            let value = single(&given)?;
            match validation {
                Some(validation) => validation.check(value),
                None => parse_number(value).map(|_| ()),
            }
        }
        QuestionKind::LinearScale { scale } => {
            let value = single(&given)?;
            let number = value
                .trim()
                .parse::<i64>()
                .map_err(|_| ValidationReason::NotANumber {
                    value: value.to_string(),
                })?;
            let below = scale.min.is_some_and(|min| number < i64::from(min));
            let above = scale.max.is_some_and(|max| number > i64::from(max));
            if below || above {
                return Err(ValidationReason::OutOfRange {
                    value: value.to_string(),
                });
            }
            Ok(())
        }
        QuestionKind::SingleChoice { options } => {
            let value = single(&given)?;
            check_option(options, value)
        }
        QuestionKind::MultiChoice { options } => given
            .iter()
            .try_for_each(|value| check_option(options, value)),
    }
}
