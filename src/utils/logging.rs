/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 临床病例模拟器");
    info!("🔌 网关: {:?}", config.gateway_provider);
    info!("🧠 模型: {}", config.llm_model_name);
    info!("🎲 主题病例概率: {:.0}%", config.topic_probability * 100.0);
    info!("{}", "=".repeat(60));
}

/// 记录病例生成完成信息
///
/// # 参数
/// - `specialty`: 专科名称
/// - `phases`: 分段数量
/// - `images`: 图片数量
pub fn log_case_loaded(specialty: &str, phases: usize, images: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 病例生成完成 [{}]", specialty);
    info!("📄 共 {} 个阶段，{} 张插图", phases, images);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
