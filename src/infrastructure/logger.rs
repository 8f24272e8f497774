//! 構造化ログの初期化。
//! tracing クレートを使用し、JSON またはテキスト形式の構造化ログを出力する。

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 環境名に対応する既定のログレベル。
///
/// - dev: debug
/// - staging: info
/// - その他: warn
pub fn default_level(env: &str) -> &'static str {
    match env {
        "dev" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}

/// init_logger は tracing-subscriber を初期化する。
/// `RUST_LOG` が設定されていればそちらを優先し、format が "text" ならプレーンテキスト、
/// それ以外は JSON で出力する。
pub fn init_logger(env: &str, format: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(env)));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "text" {
        registry.with(fmt::layer().with_target(true)).init();
    } else {
        registry.with(fmt::layer().json().with_target(true)).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level("dev"), "debug");
        assert_eq!(default_level("staging"), "info");
        assert_eq!(default_level("prod"), "warn");
    }
}
