use crate::Result;
use duckdb::{Connection, Row, params};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::DbMessage;
use super::models::ExecutionRow;

const EXECUTION_COLUMNS: &str =
    "id, definition_id, filename, status, message, size, created_at, updated_at";

/// DuckDB Actor - 确保单线程访问DuckDB
pub struct DuckDbActor {
    connection: Connection,
}

impl DuckDbActor {
    /// 创建新的DuckDB Actor
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let connection = Connection::open(db_path)?;
        Ok(Self { connection })
    }

    /// 创建内存DuckDB Actor
    pub fn new_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    /// 运行Actor消息循环
    pub async fn run(mut self, mut receiver: mpsc::Receiver<DbMessage>) {
        info!("DuckDB Actor 已启动");

        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }

        info!("DuckDB Actor 已关闭");
    }

    /// 处理数据库消息
    fn handle_message(&mut self, message: DbMessage) {
        match message {
            DbMessage::InitTables { respond_to } => {
                let result = self.init_tables();
                let _ = respond_to.send(result);
            }
            DbMessage::CreateExecution {
                definition_id,
                filename,
                respond_to,
            } => {
                let result = self.create_execution(definition_id, &filename);
                let _ = respond_to.send(result);
            }
            DbMessage::UpdateExecutionStatus {
                execution_id,
                status,
                respond_to,
            } => {
                let result = self.update_execution_status(execution_id, status.as_deref());
                let _ = respond_to.send(result);
            }
            DbMessage::FinalizeExecution {
                execution_id,
                status,
                message,
                size,
                respond_to,
            } => {
                let result = self.finalize_execution(
                    execution_id,
                    status.as_deref(),
                    message.as_deref(),
                    size,
                );
                let _ = respond_to.send(result);
            }
            DbMessage::GetExecution {
                execution_id,
                respond_to,
            } => {
                let result = self.get_execution(execution_id);
                let _ = respond_to.send(result);
            }
            DbMessage::ListExecutions {
                definition_id,
                respond_to,
            } => {
                let result = self.list_executions(definition_id);
                let _ = respond_to.send(result);
            }
            DbMessage::GetSuccessfulExecutions {
                definition_id,
                skip,
                respond_to,
            } => {
                let result = self.get_successful_executions(definition_id, skip);
                let _ = respond_to.send(result);
            }
            DbMessage::DeleteExecution {
                execution_id,
                respond_to,
            } => {
                let result = self.delete_execution(execution_id);
                let _ = respond_to.send(result);
            }
        }
    }

    /// 初始化数据库表
    fn init_tables(&mut self) -> Result<()> {
        debug!("正在初始化DuckDB表...");

        // 读取并执行SQL初始化脚本
        let sql_content = include_str!("../../migrations/init_duckdb.sql");

        // 按分号分割SQL语句并执行
        for statement in sql_content.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                self.connection.execute(trimmed, [])?;
            }
        }

        info!("DuckDB表初始化完成");
        Ok(())
    }

    fn map_execution(row: &Row<'_>) -> duckdb::Result<ExecutionRow> {
        Ok(ExecutionRow {
            id: row.get(0)?,
            definition_id: row.get(1)?,
            filename: row.get(2)?,
            status: row.get(3)?,
            message: row.get(4)?,
            size: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// 创建执行记录
    fn create_execution(&mut self, definition_id: i64, filename: &str) -> Result<i64> {
        // 插入记录，让数据库自动生成ID
        let id: i64 = self.connection.query_row(
            "INSERT INTO backup_executions (definition_id, filename) VALUES (?, ?) RETURNING id",
            params![definition_id, filename],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    /// 更新执行状态
    fn update_execution_status(&mut self, execution_id: i64, status: Option<&str>) -> Result<usize> {
        let updated = self.connection.execute(
            "UPDATE backup_executions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status, execution_id],
        )?;
        Ok(updated)
    }

    /// 写入最终结果
    fn finalize_execution(
        &mut self,
        execution_id: i64,
        status: Option<&str>,
        message: Option<&str>,
        size: i64,
    ) -> Result<usize> {
        let updated = self.connection.execute(
            "UPDATE backup_executions SET status = ?, message = ?, size = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status, message, size, execution_id],
        )?;
        Ok(updated)
    }

    /// 根据ID获取执行记录
    fn get_execution(&mut self, execution_id: i64) -> Result<Option<ExecutionRow>> {
        let sql = format!("SELECT {EXECUTION_COLUMNS} FROM backup_executions WHERE id = ?");
        let mut stmt = self.connection.prepare(&sql)?;
        let mut rows = stmt.query(params![execution_id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::map_execution(row)?))
        } else {
            Ok(None)
        }
    }

    /// 获取某个定义的全部执行记录
    fn list_executions(&mut self, definition_id: i64) -> Result<Vec<ExecutionRow>> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM backup_executions
             WHERE definition_id = ? ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let iter = stmt.query_map(params![definition_id], Self::map_execution)?;

        let mut executions = Vec::new();
        for execution in iter {
            executions.push(execution?);
        }

        Ok(executions)
    }

    /// 获取成功的执行记录，最新的在前
    fn get_successful_executions(&mut self, definition_id: i64, skip: i64) -> Result<Vec<ExecutionRow>> {
        let sql = format!(
            "SELECT {EXECUTION_COLUMNS} FROM backup_executions
             WHERE definition_id = ? AND status = 'success'
             ORDER BY created_at DESC, id DESC OFFSET ?"
        );
        let mut stmt = self.connection.prepare(&sql)?;
        let iter = stmt.query_map(params![definition_id, skip], Self::map_execution)?;

        let mut executions = Vec::new();
        for execution in iter {
            executions.push(execution?);
        }

        Ok(executions)
    }

    /// 删除执行记录
    fn delete_execution(&mut self, execution_id: i64) -> Result<()> {
        self.connection.execute(
            "DELETE FROM backup_executions WHERE id = ?",
            params![execution_id],
        )?;
        Ok(())
    }
}
