use crate::app::CliApp;
use crate::utils::format_size;
use anyhow::Result;
use dockyard_core::dispatch::DispatchOutcome;
use dockyard_core::models::{ExecutionStatus, RunOutcome};
use dockyard_core::store::ExecutionStore;
use tracing::{error, info, instrument, warn};

fn report_outcome(definition_id: i64, outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::AlreadyRunning => {
            warn!("⏳ 备份定义 {} 正在运行，跳过", definition_id);
        }
        DispatchOutcome::Ran(RunOutcome::Skipped) => {
            info!("⏭️  备份定义 {} 的数据库未运行，跳过", definition_id);
        }
        DispatchOutcome::Ran(RunOutcome::Completed {
            execution_id,
            status,
            size,
        }) => match status {
            ExecutionStatus::Success => info!(
                "✅ 备份定义 {} 完成，执行记录 {}，大小 {}",
                definition_id,
                execution_id,
                format_size(*size)
            ),
            _ => error!(
                "❌ 备份定义 {} 失败，执行记录 {}，使用 `dockyard list {}` 查看输出",
                definition_id, execution_id, definition_id
            ),
        },
    }
}

/// 立即执行一次指定备份定义
#[instrument(skip(app))]
pub async fn run_backup(app: &CliApp, definition_id: i64) -> Result<()> {
    let job = app.config.resolve_job(definition_id)?;
    if !job.definition.enabled {
        warn!("⚠️  备份定义 {} 已禁用，仍按手动请求执行", definition_id);
    }

    info!(
        "💾 备份数据库 {} (主机 {})",
        job.database.name, job.server.name
    );
    let outcome = app.dispatcher.dispatch(&job).await?;
    report_outcome(definition_id, &outcome);
    Ok(())
}

/// 并发执行所有启用的备份定义
#[instrument(skip(app))]
pub async fn run_all_backups(app: &CliApp) -> Result<()> {
    let jobs = app.config.enabled_jobs()?;
    if jobs.is_empty() {
        info!("📦 没有启用的备份定义");
        return Ok(());
    }

    info!("💾 执行 {} 个备份定义", jobs.len());
    let results = app.dispatcher.dispatch_all(jobs).await;

    let mut failures = 0;
    for (definition_id, result) in &results {
        match result {
            Ok(outcome) => report_outcome(*definition_id, outcome),
            Err(e) => {
                failures += 1;
                error!("❌ 备份定义 {} 执行异常: {}", definition_id, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} 个备份任务执行异常");
    }
    Ok(())
}

/// 列出执行记录（新到旧）
#[instrument(skip(app))]
pub async fn list_executions(app: &CliApp, definition_id: i64) -> Result<()> {
    if app.config.definition(definition_id).is_none() {
        warn!("⚠️  配置中没有备份定义 {}，仍然列出历史记录", definition_id);
    }

    let executions = app.store.list(definition_id).await?;
    if executions.is_empty() {
        info!("📦 备份定义 {} 暂无执行记录", definition_id);
        info!("💡 使用以下命令执行备份:");
        info!("   dockyard run {}", definition_id);
        return Ok(());
    }

    info!("📦 备份定义 {} 的执行记录", definition_id);
    info!(
        "{:<6} {:<20} {:<8} {:<10} {}",
        "ID", "创建时间", "状态", "大小", "文件路径"
    );
    info!("{}", "-".repeat(100));

    let mut total_size = 0u64;
    for execution in &executions {
        total_size += execution.size;
        info!(
            "{:<6} {:<20} {:<8} {:<10} {}",
            execution.id,
            execution.created_at.format("%Y-%m-%d %H:%M:%S"),
            execution.status.display_name(),
            format_size(execution.size),
            execution.filename
        );
        if let Some(message) = &execution.message {
            for line in message.lines() {
                info!("       └ {}", line);
            }
        }
    }

    info!("{}", "-".repeat(100));
    info!(
        "共 {} 条记录，合计 {}",
        executions.len(),
        format_size(total_size)
    );
    Ok(())
}

/// 按保留策略清理旧备份
#[instrument(skip(app))]
pub async fn prune_backups(app: &CliApp, definition_id: i64) -> Result<()> {
    let job = app.config.resolve_job(definition_id)?;
    info!(
        "🧹 按保留策略清理备份定义 {}（保留 {} 个）",
        definition_id, job.definition.keep_local_count
    );

    let report = app.dispatcher.engine().prune(&job).await?;
    if report.deleted.is_empty() && report.failures.is_empty() {
        info!("✅ 没有需要清理的备份");
        return Ok(());
    }

    info!("✅ 已删除 {} 个旧备份", report.deleted.len());
    for failure in &report.failures {
        warn!("⚠️  {}", failure);
    }
    Ok(())
}
