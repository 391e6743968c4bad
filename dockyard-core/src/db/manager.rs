use crate::{DockyardError, Result};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

use super::actor::DuckDbActor;
use super::messages::DbMessage;
use super::models::ExecutionRow;

/// DuckDB数据库管理器
#[derive(Debug, Clone)]
pub struct DuckDbManager {
    sender: mpsc::Sender<DbMessage>,
}

impl DuckDbManager {
    /// 创建新的DuckDB管理器
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // 确保数据库文件的父目录存在
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let (sender, receiver) = mpsc::channel(100);

        // 启动DuckDB Actor
        let actor = DuckDbActor::new(db_path)?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 创建内存数据库管理器
    pub async fn new_memory() -> Result<Self> {
        let (sender, receiver) = mpsc::channel(100);

        // 启动DuckDB Actor（内存模式）
        let actor = DuckDbActor::new_memory()?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 发送消息并等待Actor响应
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> DbMessage,
    ) -> Result<T> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| DockyardError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| DockyardError::custom("等待数据库响应失败"))?
    }

    /// 初始化数据库表
    async fn init_tables(&self) -> Result<()> {
        self.request(|respond_to| DbMessage::InitTables { respond_to })
            .await
    }

    /// 创建执行记录，返回记录ID
    pub async fn create_execution(&self, definition_id: i64, filename: String) -> Result<i64> {
        self.request(|respond_to| DbMessage::CreateExecution {
            definition_id,
            filename,
            respond_to,
        })
        .await
    }

    /// 更新执行状态，返回受影响行数
    pub async fn update_execution_status(
        &self,
        execution_id: i64,
        status: Option<&str>,
    ) -> Result<usize> {
        let status = status.map(str::to_string);
        self.request(|respond_to| DbMessage::UpdateExecutionStatus {
            execution_id,
            status,
            respond_to,
        })
        .await
    }

    /// 写入最终状态、输出与大小，返回受影响行数
    pub async fn finalize_execution(
        &self,
        execution_id: i64,
        status: Option<&str>,
        message: Option<String>,
        size: i64,
    ) -> Result<usize> {
        let status = status.map(str::to_string);
        self.request(|respond_to| DbMessage::FinalizeExecution {
            execution_id,
            status,
            message,
            size,
            respond_to,
        })
        .await
    }

    /// 根据ID获取执行记录
    pub async fn get_execution(&self, execution_id: i64) -> Result<Option<ExecutionRow>> {
        self.request(|respond_to| DbMessage::GetExecution {
            execution_id,
            respond_to,
        })
        .await
    }

    /// 获取某个定义的全部执行记录（新到旧）
    pub async fn list_executions(&self, definition_id: i64) -> Result<Vec<ExecutionRow>> {
        self.request(|respond_to| DbMessage::ListExecutions {
            definition_id,
            respond_to,
        })
        .await
    }

    /// 获取成功的执行记录（新到旧），跳过最新的 skip 条
    pub async fn get_successful_executions(
        &self,
        definition_id: i64,
        skip: i64,
    ) -> Result<Vec<ExecutionRow>> {
        self.request(|respond_to| DbMessage::GetSuccessfulExecutions {
            definition_id,
            skip,
            respond_to,
        })
        .await
    }

    /// 删除执行记录
    pub async fn delete_execution(&self, execution_id: i64) -> Result<()> {
        self.request(|respond_to| DbMessage::DeleteExecution {
            execution_id,
            respond_to,
        })
        .await
    }
}
