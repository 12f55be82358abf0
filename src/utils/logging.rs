/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则按 `verbose` 选择 debug 或 info 级别。
/// 重复调用不会 panic（测试中可多次调用）。
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
/// - `total_groups`: 待处理的组数
/// - `max_concurrent`: 最大并发下载数
pub fn log_startup(total_groups: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 试卷抓取与下载");
    info!("📚 待处理组数: {}", total_groups);
    info!("📊 最大并发下载数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录组开始信息
pub fn log_group_start(group_num: usize, total_groups: usize, prefix: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 组: {}", group_num, total_groups, prefix);
    info!("{}", "=".repeat(60));
}

/// 记录组完成信息
///
/// # 参数
/// - `prefix`: 组前缀
/// - `local_files`: 本地文件数
/// - `resolved`: 已解析的直链数
pub fn log_group_complete(prefix: &str, local_files: usize, resolved: usize) {
    info!("\n{}", "─".repeat(60));
    info!(
        "[{}] ✓ 处理完成: {}/{} 个文件已下载",
        prefix, local_files, resolved
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功的组数
/// - `failed`: 失败的组数
/// - `files`: 下载的文件总数
/// - `skipped_items`: 被跳过的条目总数
pub fn print_final_stats(success: usize, failed: usize, files: usize, skipped_items: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功组数: {}/{}", success, success + failed);
    info!("❌ 失败组数: {}", failed);
    info!("📄 本次下载文件: {}", files);
    info!("⚠️ 跳过条目: {}", skipped_items);
    info!("{}", "=".repeat(60));
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
