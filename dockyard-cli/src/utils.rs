use dockyard_core::constants::logging;

/// 设置日志记录系统
///
/// 库代码只使用 tracing 宏记录日志，输出行为在这里统一配置：
/// - 支持 RUST_LOG 环境变量控制日志级别
/// - 设置 DOCKYARD_LOG_FILE 时以详细格式写入文件
/// - 终端输出使用简洁格式
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose {
        "debug"
    } else {
        logging::DEFAULT_LOG_LEVEL
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Ok(log_file) = std::env::var(logging::LOG_FILE_ENV) {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
        {
            Ok(file) => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(file)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .init();
                return;
            }
            Err(e) => {
                eprintln!("无法打开日志文件 {log_file}: {e}，改为输出到终端");
            }
        }
    }

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(false)
        .with_line_number(false)
        .without_time()
        .compact()
        .init();
}

/// 以 B/KB/MB/GB 格式化文件大小
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.1}GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.1}MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.1}KB", size as f64 / KB as f64)
    } else {
        format!("{size}B")
    }
}
