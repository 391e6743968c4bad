use chrono::{DateTime, Utc};

/// 备份执行记录（数据库原始行）
#[derive(Debug, Clone)]
pub struct ExecutionRow {
    pub id: i64,
    pub definition_id: i64,
    pub filename: String,
    pub status: Option<String>,
    pub message: Option<String>,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
