use crate::Result;
use tokio::sync::oneshot;

use super::models::ExecutionRow;

/// DuckDB数据库操作消息
#[derive(Debug)]
pub enum DbMessage {
    /// 初始化数据库表
    InitTables {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 创建执行记录（状态为空）
    CreateExecution {
        definition_id: i64,
        filename: String,
        respond_to: oneshot::Sender<Result<i64>>,
    },
    /// 仅更新状态，返回受影响行数
    UpdateExecutionStatus {
        execution_id: i64,
        status: Option<String>,
        respond_to: oneshot::Sender<Result<usize>>,
    },
    /// 写入最终状态、输出与大小，返回受影响行数
    FinalizeExecution {
        execution_id: i64,
        status: Option<String>,
        message: Option<String>,
        size: i64,
        respond_to: oneshot::Sender<Result<usize>>,
    },
    /// 根据ID获取执行记录
    GetExecution {
        execution_id: i64,
        respond_to: oneshot::Sender<Result<Option<ExecutionRow>>>,
    },
    /// 获取某个备份定义的全部执行记录（新到旧）
    ListExecutions {
        definition_id: i64,
        respond_to: oneshot::Sender<Result<Vec<ExecutionRow>>>,
    },
    /// 获取成功的执行记录（新到旧），跳过前 skip 条
    GetSuccessfulExecutions {
        definition_id: i64,
        skip: i64,
        respond_to: oneshot::Sender<Result<Vec<ExecutionRow>>>,
    },
    /// 删除执行记录
    DeleteExecution {
        execution_id: i64,
        respond_to: oneshot::Sender<Result<()>>,
    },
}
