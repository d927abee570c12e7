pub mod chat;
pub mod questionnaire;
pub mod response;
pub mod user;
