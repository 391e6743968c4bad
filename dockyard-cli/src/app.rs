use anyhow::{Context, Result};
use dockyard_core::{
    backup::BackupEngine,
    config::AppConfig,
    db::DuckDbManager,
    dispatch::Dispatcher,
    executor::{LocalExecutor, RemoteExecutor, SshExecutor},
    lock::LeaseLock,
    notification::{FanoutNotifier, NotificationSink, TracingNotifier, WebhookNotifier},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::Commands;
use crate::commands;

#[derive(Clone)]
pub struct CliApp {
    pub config: AppConfig,
    pub store: Arc<DuckDbManager>,
    pub dispatcher: Dispatcher,
}

impl CliApp {
    /// 加载配置文件：指定路径存在时直接使用，否则按默认文件名查找
    pub fn load_config(path: &Path) -> dockyard_core::Result<AppConfig> {
        if path.exists() {
            info!("使用配置文件: {}", path.display());
            AppConfig::load_from_file(path)
        } else {
            AppConfig::find_and_load_config()
        }
    }

    /// 根据配置初始化CLI应用
    pub async fn new(config: AppConfig, local: bool) -> Result<Self> {
        config.ensure_data_dir()?;

        let store = Arc::new(
            DuckDbManager::new(config.database_path())
                .await
                .with_context(|| format!("打开执行记录数据库失败: {}", config.backup.database_file))?,
        );

        let executor: Arc<dyn RemoteExecutor> = if local {
            debug!("使用本机执行器");
            Arc::new(LocalExecutor::new(config.ssh.command_timeout_secs))
        } else {
            Arc::new(SshExecutor::new(config.ssh.clone()))
        };

        let notifier = Arc::new(Self::build_notifier(&config)?);
        let engine = BackupEngine::new(
            executor,
            store.clone(),
            notifier,
            config.backup.root_dir.clone(),
        );
        let dispatcher = Dispatcher::new(engine, LeaseLock::default());

        Ok(Self {
            config,
            store,
            dispatcher,
        })
    }

    fn build_notifier(config: &AppConfig) -> Result<FanoutNotifier> {
        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(TracingNotifier)];
        if config.notifications.has_webhook() {
            let webhook = WebhookNotifier::new(
                config.notifications.webhook_url.clone(),
                config.notifications.operator_webhook_url.clone(),
            )
            .context("创建 Webhook 客户端失败")?;
            sinks.push(Arc::new(webhook));
        }
        Ok(FanoutNotifier::new(sinks))
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Run { definition_id } => commands::run_backup(self, definition_id).await,
            Commands::RunAll => commands::run_all_backups(self).await,
            Commands::List { definition_id } => commands::list_executions(self, definition_id).await,
            Commands::Prune { definition_id } => commands::prune_backups(self, definition_id).await,
            // 以下命令不需要初始化应用，已在 main.rs 中处理
            Commands::Init { .. } | Commands::Buildpack { .. } | Commands::CheckConfig => {
                unreachable!()
            }
        }
    }
}
