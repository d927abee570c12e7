//! 로깅 초기화 모듈
//!
//! stdout과 일별 로그 파일에 JSON 형식으로 동시에 출력한다.

use tracing::Subscriber;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, writer::MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const DEFAULT_FILTER: &str = "info,questionnaire_server=debug,tower_http=debug";
const LOG_FILE_PREFIX: &str = "questionnaire.log";

/// stdout과 파일에 같은 JSON 형식을 쓴다
fn json_layer<S, W>(writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false)
        .with_ansi(false)
        .with_writer(writer)
        .boxed()
}

/// 로깅 시스템을 초기화한다.
///
/// 로그 레벨은 `RUST_LOG`로 바꿀 수 있고, 파일은 `LOG_DIR`(기본 `logs`) 아래
/// `questionnaire.log.YYYY-MM-DD`로 쌓인다.
///
/// 반환된 guard는 main이 끝날 때까지 들고 있어야 버퍼에 남은 로그가 유실되지 않는다.
pub fn init_logging() -> WorkerGuard {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_FILE_PREFIX));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer(std::io::stdout))
        .with(json_layer(file_writer))
        .try_init();

    // 테스트처럼 이미 초기화된 경우에는 기존 구독자를 그대로 쓴다
    if let Err(err) = result {
        eprintln!("tracing already initialized or unavailable: {}", err);
    }

    guard
}
