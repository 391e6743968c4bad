use crate::project_info::get_version_string;
use anyhow::Result;
use dockyard_core::config::AppConfig;
use tracing::{error, info, instrument};

/// 检查配置文件中的引用关系与备份定义
#[instrument(skip(config))]
pub fn check_config(config: &AppConfig) -> Result<()> {
    info!("🔍 {} 配置检查", get_version_string());
    info!(
        "   团队 {} 个，主机 {} 个，数据库 {} 个，备份定义 {} 个",
        config.teams.len(),
        config.servers.len(),
        config.databases.len(),
        config.definitions.len()
    );

    let problems = config.problems();
    if problems.is_empty() {
        info!("✅ 配置有效");
        return Ok(());
    }

    for problem in &problems {
        error!("   - {}", problem);
    }
    anyhow::bail!("配置存在 {} 个问题", problems.len())
}
