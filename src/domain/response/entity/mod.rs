pub mod answer;
pub mod respondent;
