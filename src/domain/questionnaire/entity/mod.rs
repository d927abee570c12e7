pub mod administrator;
pub mod question;
pub mod question_option;
pub mod questionnaire;
pub mod scale_label;
pub mod target;
pub mod validation;
