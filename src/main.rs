use std::net::SocketAddr;

use questionnaire_server::config::AppConfig;
use questionnaire_server::state::AppState;
use questionnaire_server::utils::logging::init_logging;
use questionnaire_server::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 환경변수 로드
    dotenvy::dotenv().ok();

    // 2. 로깅 초기화 (guard는 종료 시까지 유지)
    let _log_guard = init_logging();

    // 3. 설정과 협력 객체 준비
    let config = AppConfig::from_env()?;
    let port = config.server_port;
    let state = AppState::from_config(config).await?;

    // 4. 마감 알림 복원
    let now = chrono::Utc::now().naive_utc();
    let reminded = state.reminders.restore(now).await?;
    tracing::info!("Deadline reminders scheduled for {} questionnaires", reminded);

    // 5. 서버 실행
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
