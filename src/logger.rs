//! 日志初始化

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 未设置 `RUST_LOG` 时使用的日志级别
fn default_level(config: &Config) -> &'static str {
    if config.verbose_logging {
        "debug"
    } else {
        "info"
    }
}

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则根据配置中的 `verbose_logging` 选择 info / debug。
/// 重复调用是安全的（测试中会多次调用）。
pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(config)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
