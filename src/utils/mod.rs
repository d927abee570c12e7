pub mod auth;
pub mod error;
pub mod logging;
pub mod response;

use chrono::NaiveDateTime;

pub use response::{BaseResponse, ErrorResponse};

/// API 응답에 쓰는 시각 형식
pub fn format_datetime(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}
