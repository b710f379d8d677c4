/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::QuizSession;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时默认 `info`，`verbose` 为真时为 `debug`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `model_name`: 使用的模型
/// - `data_dir`: 数据目录
pub fn log_startup(model_name: &str, data_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 认证考试练习");
    info!("🤖 模型: {}", model_name);
    info!("💾 数据目录: {}", data_dir);
    info!("{}", "=".repeat(60));
}

/// 记录会话开始信息
pub fn log_session_start(session: &QuizSession) {
    info!("\n{}", "=".repeat(60));
    info!("📝 开始测验: {}", session.config.certificate_name);
    info!(
        "📋 目标题数: {}，语言: {}",
        session.target_questions, session.config.language
    );
    if !session.current_questions.is_empty() {
        info!("📚 已有题目: {}", session.current_questions.len());
    }
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `batch_size`: 本批请求的题目数
pub fn log_batch_start(batch_num: usize, total_batches: usize, batch_size: usize) {
    info!("\n{}", "─".repeat(60));
    info!("📦 生成第 {}/{} 批，本批 {} 题", batch_num, total_batches, batch_size);
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `success`: 有效题目数
/// - `requested`: 请求的题目数
pub fn log_batch_complete(batch_num: usize, success: usize, requested: usize) {
    info!("✓ 第 {} 批完成: 有效 {}/{}", batch_num, success, requested);
    info!("{}", "─".repeat(60));
}

/// 打印测验结束统计
pub fn print_final_stats(session: &QuizSession) {
    let answered = session.answers.len();
    let percentage = if answered == 0 {
        0
    } else {
        (session.score as f64 / answered as f64 * 100.0).round() as u32
    };

    info!("\n{}", "=".repeat(60));
    info!("📊 测验结束统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 答对: {}/{}", session.score, answered);
    info!("📈 正确率: {}%", percentage);
    if session.current_questions.len() < session.target_questions {
        info!(
            "⚠️ 仅获取到 {}/{} 题",
            session.current_questions.len(),
            session.target_questions
        );
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
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
