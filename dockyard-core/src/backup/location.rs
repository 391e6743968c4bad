use crate::constants::backup;
use crate::models::{DatabaseTarget, Server, Team};
use regex::Regex;
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("slug 正则无效"));

/// 转为小写，连续的非字母数字字符替换为单个 `-`，并去掉首尾的 `-`
pub fn slug(input: &str) -> String {
    let lower = input.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// 一次备份在远程主机上的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLocation {
    /// 备份目录
    pub directory: String,
    /// 以 `/` 开头的文件名
    pub file_name: String,
    /// 执行 pg_dump 的容器
    pub container: String,
}

impl BackupLocation {
    /// 计算备份目录、文件名与容器名
    pub fn compute(
        backup_root: &str,
        team: &Team,
        database: &DatabaseTarget,
        server: &Server,
        timestamp: i64,
    ) -> Self {
        let root = backup_root.trim_end_matches('/');

        let (directory, container) = if database.is_platform_database() {
            (
                format!(
                    "{root}/{}/{}-{}",
                    backup::SYSTEM_DIR_NAME,
                    backup::SYSTEM_DATABASE_NAME,
                    slug(&server.ip)
                ),
                backup::SYSTEM_DATABASE_NAME.to_string(),
            )
        } else {
            (
                format!(
                    "{root}/{}/{}-{}/{}",
                    backup::DATABASES_DIR_NAME,
                    slug(&team.name),
                    team.id,
                    database.uuid
                ),
                database.uuid.clone(),
            )
        };

        let file_name = format!(
            "/{}{timestamp}{}",
            backup::DUMP_FILE_PREFIX,
            backup::DUMP_FILE_EXTENSION
        );

        Self {
            directory,
            file_name,
            container,
        }
    }

    /// 完整文件路径
    pub fn location(&self) -> String {
        format!("{}{}", self.directory, self.file_name)
    }
}
