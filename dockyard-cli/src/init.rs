use dockyard_core::{Result, config::AppConfig, db::DuckDbManager};
use std::path::Path;
use tracing::{info, warn};

/// 创建默认配置文件和执行记录数据库
pub async fn run_init(config_path: &Path, force: bool) -> Result<()> {
    info!("⚓ Dockyard 初始化");

    if config_path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", config_path.display());
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: dockyard init --force");
        return Ok(());
    }

    let config = AppConfig::default();
    config.save_to_file(config_path)?;
    info!("   ✅ 创建配置文件: {}", config_path.display());

    config.ensure_data_dir()?;
    DuckDbManager::new(config.database_path()).await?;
    info!("   ✅ 创建执行记录数据库: {}", config.backup.database_file);

    info!("👉 编辑配置文件添加团队、主机、数据库和备份定义后，运行 `dockyard check-config` 检查");
    Ok(())
}
