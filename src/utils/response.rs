use serde::Serialize;
use utoipa::ToSchema;

const SUCCESS_CODE: &str = "COMMON200";
const SUCCESS_MESSAGE: &str = "성공입니다.";

/// 성공 응답 봉투
///
/// ```json
/// { "isSuccess": true, "code": "COMMON200", "message": "성공입니다.", "result": { ... } }
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse<T: Serialize> {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    pub result: Option<T>,
}

impl<T: Serialize> BaseResponse<T> {
    pub fn success(result: T) -> Self {
        Self::with_result(Some(result))
    }

    /// 돌려줄 값이 없는 성공 (삭제, 철회). `result`는 null로 나간다.
    pub fn empty() -> Self {
        Self::with_result(None)
    }

    fn with_result(result: Option<T>) -> Self {
        Self {
            is_success: true,
            code: SUCCESS_CODE.to_string(),
            message: SUCCESS_MESSAGE.to_string(),
            result,
        }
    }
}

/// 실패 응답 봉투. 답변 검증 실패 시 `result`에 `{questionId, reason}`이 들어간다.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub is_success: bool,
    pub code: String,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            code: code.into(),
            message: message.into(),
            result: None,
        }
    }

    pub fn with_detail(mut self, detail: Option<serde_json::Value>) -> Self {
        self.result = detail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_render_empty_success_with_null_result() {
        let body = serde_json::to_value(BaseResponse::<()>::empty()).unwrap();

        assert_eq!(
            body,
            json!({
                "isSuccess": true,
                "code": "COMMON200",
                "message": "성공입니다.",
                "result": null
            })
        );
    }

    #[test]
    fn should_attach_detail_to_error() {
        let error = ErrorResponse::new("RESPONSE400", "거부됨")
            .with_detail(Some(json!({ "questionId": 7 })));

        let body = serde_json::to_value(error).unwrap();

        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["result"]["questionId"], 7);
    }
}
