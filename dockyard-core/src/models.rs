use crate::constants::{backup, cron, ssh, upload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 团队
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// 执行远程命令的主机
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub name: String,
    pub ip: String,
    #[serde(default = "default_ssh_user")]
    pub user: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

fn default_ssh_user() -> String {
    ssh::DEFAULT_USER.to_string()
}

fn default_ssh_port() -> u16 {
    ssh::DEFAULT_PORT
}

/// 数据库引擎
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Postgresql,
    Mysql,
    Mariadb,
    Mongodb,
    Redis,
}

impl DatabaseEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgresql => "postgresql",
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Mariadb => "mariadb",
            DatabaseEngine::Mongodb => "mongodb",
            DatabaseEngine::Redis => "redis",
        }
    }
}

/// 被备份的数据库实例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseTarget {
    pub id: i64,
    pub name: String,
    /// 容器标识，同时作为备份目录名
    pub uuid: String,
    /// 生命周期状态，例如 "running:healthy"、"exited"
    pub status: String,
    #[serde(default = "default_engine")]
    pub engine: DatabaseEngine,
    #[serde(default = "default_postgres")]
    pub postgres_user: String,
    #[serde(default = "default_postgres")]
    pub postgres_db: String,
    /// 上传辅助容器加入的网络
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_engine() -> DatabaseEngine {
    DatabaseEngine::Postgresql
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_network() -> String {
    upload::SYSTEM_NETWORK.to_string()
}

impl DatabaseTarget {
    /// 状态是否为运行中
    pub fn is_running(&self) -> bool {
        self.status.starts_with(backup::RUNNING_STATUS_PREFIX)
    }

    /// 是否为哨兵系统数据库（ID 为 0，免除状态检查）
    pub fn is_system_database(&self) -> bool {
        self.id == backup::SYSTEM_DATABASE_ID
    }

    /// 是否为平台自身的元数据库
    pub fn is_platform_database(&self) -> bool {
        self.name == backup::SYSTEM_DATABASE_NAME
    }

    /// 是否满足备份前置条件
    pub fn is_backupable(&self) -> bool {
        self.is_running() || self.is_system_database()
    }
}

/// 对象存储目标
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteStorageTarget {
    pub key: String,
    pub secret: String,
    pub bucket: String,
    pub endpoint: String,
}

impl fmt::Debug for RemoteStorageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStorageTarget")
            .field("key", &self.key)
            .field("secret", &"***")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RemoteStorageTarget {
    /// 检查必填字段
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("key", &self.key),
            ("secret", &self.secret),
            ("bucket", &self.bucket),
            ("endpoint", &self.endpoint),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        missing
    }
}

/// 定时备份定义
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupDefinition {
    pub id: i64,
    pub uuid: String,
    pub team_id: i64,
    pub database_id: i64,
    /// 执行备份的主机名
    pub server: String,
    /// 本地保留的成功备份数量，0 表示每次成功后删除全部本地备份
    #[serde(default)]
    pub keep_local_count: u32,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub save_remote: bool,
    #[serde(default)]
    pub remote_storage: Option<RemoteStorageTarget>,
}

fn default_frequency() -> String {
    cron::DEFAULT_BACKUP_CRON.to_string()
}

fn default_true() -> bool {
    true
}

impl BackupDefinition {
    /// 需要上传时返回对象存储目标
    pub fn upload_target(&self) -> Option<&RemoteStorageTarget> {
        if self.save_remote {
            self.remote_storage.as_ref()
        } else {
            None
        }
    }

    /// 检查 cron 表达式的基本格式
    pub fn has_valid_frequency(&self) -> bool {
        let parts: Vec<&str> = self.frequency.split_whitespace().collect();
        parts.len() == cron::CRON_FIELDS_COUNT
    }
}

/// 一次备份所需的全部已解析对象
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub definition: BackupDefinition,
    pub database: DatabaseTarget,
    pub team: Team,
    pub server: Server,
}

/// 执行状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Success,
    Failed,
}

impl ExecutionStatus {
    /// 数据库中的存储值，Pending 存为 NULL
    pub fn as_db_value(&self) -> Option<&'static str> {
        match self {
            ExecutionStatus::Pending => None,
            ExecutionStatus::Success => Some("success"),
            ExecutionStatus::Failed => Some("failed"),
        }
    }

    pub fn from_db_value(value: Option<&str>) -> Self {
        match value {
            Some("success") => ExecutionStatus::Success,
            Some("failed") => ExecutionStatus::Failed,
            _ => ExecutionStatus::Pending,
        }
    }

    /// 获取状态的显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

/// 备份执行记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupExecution {
    pub id: i64,
    pub definition_id: i64,
    /// 远程主机上的完整转储文件路径
    pub filename: String,
    pub status: ExecutionStatus,
    pub message: Option<String>,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 一次 run 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// 数据库未运行，静默跳过
    Skipped,
    Completed {
        execution_id: i64,
        status: ExecutionStatus,
        size: u64,
    },
}
