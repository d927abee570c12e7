use axum::{
    async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts,
};
use tracing::debug;

use crate::state::AppState;
use crate::utils::error::AppError;

/// 인증된 사용자. 채팅 서비스가 돌려준 식별자를 담는다.
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn identity(&self) -> &str {
        &self.0
    }
}

/// `Authorization: Bearer <token>`에서 토큰을 꺼낸다
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("로그인이 필요합니다."))?
        .to_str()
        .map_err(|_| AppError::unauthorized("잘못된 헤더 형식입니다."))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("토큰 형식이 올바르지 않습니다."))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.identity.resolve(token).await?;
        debug!(identity = %identity, "caller resolved");

        Ok(AuthUser(identity))
    }
}
