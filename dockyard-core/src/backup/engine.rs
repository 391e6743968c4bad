use super::location::BackupLocation;
use super::output::{accumulate, normalize};
use super::{commands, retention, upload};
use crate::constants::backup;
use crate::executor::RemoteExecutor;
use crate::models::{
    BackupExecution, BackupJob, DatabaseEngine, ExecutionStatus, RemoteStorageTarget, RunOutcome,
    Server,
};
use crate::notification::{BackupEvent, NotificationSink};
use crate::store::ExecutionStore;
use crate::{DockyardError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// 一次运行中累积的状态
#[derive(Debug)]
struct RunState {
    execution_id: i64,
    location: BackupLocation,
    status: ExecutionStatus,
    output: Option<String>,
    size: u64,
}

impl RunState {
    fn append(&mut self, message: &str) {
        self.output = Some(accumulate(self.output.as_deref(), message));
    }

    fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// 独立清理的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    /// 已删除的执行记录ID
    pub deleted: Vec<i64>,
    /// 删除失败的说明，对应记录被保留
    pub failures: Vec<String>,
}

/// 数据库备份执行引擎
///
/// 调用方负责保证同一个备份定义同时只有一次运行。
#[derive(Clone)]
pub struct BackupEngine {
    executor: Arc<dyn RemoteExecutor>,
    store: Arc<dyn ExecutionStore>,
    notifier: Arc<dyn NotificationSink>,
    backup_root: String,
}

impl BackupEngine {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        store: Arc<dyn ExecutionStore>,
        notifier: Arc<dyn NotificationSink>,
        backup_root: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            store,
            notifier,
            backup_root: backup_root.into(),
        }
    }

    pub fn backup_root(&self) -> &str {
        &self.backup_root
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    /// 执行一次备份
    ///
    /// 数据库未运行时返回 [`RunOutcome::Skipped`]。未处理的错误会通知运维并原样返回，
    /// 由调用方（队列）决定重试策略。
    #[instrument(skip_all, fields(definition_id = job.definition.id, database = %job.database.name))]
    pub async fn run(&self, job: &BackupJob) -> Result<RunOutcome> {
        match self.run_inner(job).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(error = %e, "数据库备份任务失败");
                self.notifier
                    .notify_operator(&format!(
                        "数据库备份任务失败 (definition {}): {e}",
                        job.definition.id
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn run_inner(&self, job: &BackupJob) -> Result<RunOutcome> {
        if !job.database.is_backupable() {
            debug!(status = %job.database.status, "数据库未运行，跳过备份");
            return Ok(RunOutcome::Skipped);
        }

        let location = BackupLocation::compute(
            &self.backup_root,
            &job.team,
            &job.database,
            &job.server,
            Utc::now().timestamp(),
        );
        let execution_id = self
            .store
            .create(job.definition.id, &location.location())
            .await?;

        info!(execution_id, location = %location.location(), "开始备份数据库");

        let mut run = RunState {
            execution_id,
            location,
            status: ExecutionStatus::Pending,
            output: None,
            size: 0,
        };

        self.dump(job, &mut run).await?;

        if run.succeeded() {
            self.measure_size(&job.server, &mut run).await;
        }

        let deferred = self.remove_old_backups(job, &mut run).await?;

        let mut uploaded = false;
        if run.succeeded() {
            if let Some(target) = job.definition.upload_target() {
                uploaded = self.upload(job, target, &mut run).await;
            }
        }

        if uploaded {
            for execution in &deferred {
                if let Some(failure) = self.remove_execution(execution, &job.server).await? {
                    run.append(&failure);
                }
            }
        } else if !deferred.is_empty() {
            warn!(file = %run.location.location(), "上传失败，保留本地备份");
            run.append(&format!(
                "{}: {}",
                backup::UPLOAD_FAILED_KEEP_MESSAGE,
                run.location.location()
            ));
        }

        self.store
            .finalize(run.execution_id, run.status, run.output.clone(), run.size)
            .await?;

        info!(
            execution_id = run.execution_id,
            status = run.status.display_name(),
            size = run.size,
            "数据库备份结束"
        );

        Ok(RunOutcome::Completed {
            execution_id: run.execution_id,
            status: run.status,
            size: run.size,
        })
    }

    /// 创建目录并执行转储，结果无论成败都先写入状态
    async fn dump(&self, job: &BackupJob, run: &mut RunState) -> Result<()> {
        let result = match job.database.engine {
            DatabaseEngine::Postgresql => {
                let commands = vec![
                    commands::mkdir(&run.location.directory),
                    commands::pg_dump(&run.location, &job.database),
                ];
                self.executor.execute(&commands, &job.server).await
            }
            other => Err(DockyardError::backup(format!(
                "不支持的数据库引擎: {}",
                other.as_str()
            ))),
        };

        match result {
            Ok(output) => {
                run.output = normalize(&output);
                run.status = ExecutionStatus::Success;
                self.notifier
                    .notify(&job.team, &BackupEvent::success(job))
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "数据库转储失败");
                run.status = ExecutionStatus::Failed;
                run.append(&e.output_message());
                self.notifier
                    .notify(&job.team, &BackupEvent::failed(job, run.output.clone()))
                    .await;
            }
        }

        self.store.update_status(run.execution_id, run.status).await
    }

    /// 查询备份文件大小，失败只记入输出
    async fn measure_size(&self, server: &Server, run: &mut RunState) {
        let command = commands::disk_usage(&run.location.location());
        match self.executor.execute(&[command], server).await {
            Ok(output) => match output.trim().parse::<u64>() {
                Ok(size) => {
                    debug!(size, "备份文件大小");
                    run.size = size;
                }
                Err(_) => {
                    warn!(output = %output.trim(), "无法解析备份文件大小");
                    run.append(&format!("无法解析备份文件大小: {}", output.trim()));
                }
            },
            Err(e) => {
                warn!(error = %e, "查询备份文件大小失败");
                run.append(&e.output_message());
            }
        }
    }

    /// 按保留策略删除旧备份，返回需要在上传成功后再删除的当前记录
    async fn remove_old_backups(
        &self,
        job: &BackupJob,
        run: &mut RunState,
    ) -> Result<Vec<BackupExecution>> {
        let selected = retention::select_for_deletion(self.store.as_ref(), &job.definition).await?;
        if selected.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = selected.len(), "按保留策略删除旧备份");

        let defer_current = run.succeeded() && job.definition.upload_target().is_some();
        let mut deferred = Vec::new();

        for execution in selected {
            if defer_current && execution.id == run.execution_id {
                deferred.push(execution);
                continue;
            }
            if let Some(failure) = self.remove_execution(&execution, &job.server).await? {
                run.append(&failure);
            }
        }

        Ok(deferred)
    }

    /// 删除远程文件，成功后删除记录
    ///
    /// 远程删除失败时保留记录并返回失败说明，继续处理其余记录；
    /// 只有存储错误会向上传播。
    async fn remove_execution(
        &self,
        execution: &BackupExecution,
        server: &Server,
    ) -> Result<Option<String>> {
        let command = commands::remove_file(&execution.filename);
        match self.executor.execute(&[command], server).await {
            Ok(_) => {
                self.store.delete(execution.id).await?;
                debug!(execution_id = execution.id, file = %execution.filename, "已删除旧备份");
                Ok(None)
            }
            Err(e) => {
                warn!(
                    execution_id = execution.id,
                    file = %execution.filename,
                    error = %e,
                    "删除旧备份失败"
                );
                Ok(Some(format!(
                    "删除旧备份 {} 失败: {}",
                    execution.filename,
                    e.output_message()
                )))
            }
        }
    }

    /// 上传到对象存储，失败只记入输出，不影响本次运行结果
    ///
    /// 返回是否上传成功。
    async fn upload(
        &self,
        job: &BackupJob,
        target: &RemoteStorageTarget,
        run: &mut RunState,
    ) -> bool {
        info!(bucket = %target.bucket, endpoint = %target.endpoint, "上传备份到对象存储");

        let commands = upload::upload_commands(job, &run.location, target);
        let uploaded = match self.executor.execute(&commands, &job.server).await {
            Ok(_) => {
                run.append(backup::UPLOAD_SUCCESS_MESSAGE);
                true
            }
            Err(e) => {
                warn!(error = %e, "上传备份失败");
                run.append(&e.output_message());
                false
            }
        };

        let cleanup = upload::cleanup_command(&job.definition.uuid);
        if let Err(e) = self.executor.execute(&[cleanup], &job.server).await {
            debug!(error = %e, "清理上传辅助容器失败");
        }
        uploaded
    }

    /// 在备份运行之外单独执行保留策略
    #[instrument(skip_all, fields(definition_id = job.definition.id))]
    pub async fn prune(&self, job: &BackupJob) -> Result<PruneReport> {
        let selected = retention::select_for_deletion(self.store.as_ref(), &job.definition).await?;
        let mut report = PruneReport::default();

        for execution in selected {
            match self.remove_execution(&execution, &job.server).await? {
                None => report.deleted.push(execution.id),
                Some(failure) => report.failures.push(failure),
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "保留策略清理完成"
        );
        Ok(report)
    }
}
