use crate::db::{DuckDbManager, ExecutionRow};
use crate::models::{BackupExecution, ExecutionStatus};
use crate::{DockyardError, Result};
use async_trait::async_trait;
use tracing::debug;

/// 备份执行记录的持久化接口
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// 创建状态为 pending 的执行记录，返回ID
    async fn create(&self, definition_id: i64, filename: &str) -> Result<i64>;

    /// 仅更新状态
    async fn update_status(&self, execution_id: i64, status: ExecutionStatus) -> Result<()>;

    /// 写入最终状态、输出与大小
    async fn finalize(
        &self,
        execution_id: i64,
        status: ExecutionStatus,
        message: Option<String>,
        size: u64,
    ) -> Result<()>;

    async fn get(&self, execution_id: i64) -> Result<Option<BackupExecution>>;

    /// 某个定义的全部执行记录，最新的在前
    async fn list(&self, definition_id: i64) -> Result<Vec<BackupExecution>>;

    /// 成功的执行记录，最新的在前，跳过前 skip 条
    async fn successful(&self, definition_id: i64, skip: usize) -> Result<Vec<BackupExecution>>;

    async fn delete(&self, execution_id: i64) -> Result<()>;
}

impl From<ExecutionRow> for BackupExecution {
    fn from(row: ExecutionRow) -> Self {
        BackupExecution {
            id: row.id,
            definition_id: row.definition_id,
            filename: row.filename,
            status: ExecutionStatus::from_db_value(row.status.as_deref()),
            message: row.message,
            size: u64::try_from(row.size).unwrap_or(0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn size_to_db(size: u64) -> Result<i64> {
    i64::try_from(size).map_err(|_| DockyardError::custom(format!("备份大小超出范围: {size}")))
}

#[async_trait]
impl ExecutionStore for DuckDbManager {
    async fn create(&self, definition_id: i64, filename: &str) -> Result<i64> {
        self.create_execution(definition_id, filename.to_string())
            .await
    }

    async fn update_status(&self, execution_id: i64, status: ExecutionStatus) -> Result<()> {
        let updated = self
            .update_execution_status(execution_id, status.as_db_value())
            .await?;
        if updated == 0 {
            debug!(execution_id, "执行记录已不存在，跳过状态更新");
        }
        Ok(())
    }

    async fn finalize(
        &self,
        execution_id: i64,
        status: ExecutionStatus,
        message: Option<String>,
        size: u64,
    ) -> Result<()> {
        let updated = self
            .finalize_execution(execution_id, status.as_db_value(), message, size_to_db(size)?)
            .await?;
        if updated == 0 {
            debug!(execution_id, "执行记录已被保留策略删除，跳过最终写入");
        }
        Ok(())
    }

    async fn get(&self, execution_id: i64) -> Result<Option<BackupExecution>> {
        Ok(self
            .get_execution(execution_id)
            .await?
            .map(BackupExecution::from))
    }

    async fn list(&self, definition_id: i64) -> Result<Vec<BackupExecution>> {
        let rows = self.list_executions(definition_id).await?;
        Ok(rows.into_iter().map(BackupExecution::from).collect())
    }

    async fn successful(&self, definition_id: i64, skip: usize) -> Result<Vec<BackupExecution>> {
        let skip = i64::try_from(skip).unwrap_or(i64::MAX);
        let rows = self.get_successful_executions(definition_id, skip).await?;
        Ok(rows.into_iter().map(BackupExecution::from).collect())
    }

    async fn delete(&self, execution_id: i64) -> Result<()> {
        self.delete_execution(execution_id).await
    }
}
