use super::location::BackupLocation;
use crate::models::DatabaseTarget;

/// 为 `sh` 引用参数
///
/// 只含安全字符时原样返回，否则用单引号包裹，内部的 `'` 转为 `'"'"'`。
pub fn shell_quote(value: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c);
    if !value.is_empty() && value.chars().all(safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\"'\"'"))
}

/// 创建备份目录
pub fn mkdir(directory: &str) -> String {
    format!("mkdir -p {}", shell_quote(directory))
}

/// 在数据库容器内执行 pg_dump，输出重定向到宿主机上的备份文件
pub fn pg_dump(location: &BackupLocation, database: &DatabaseTarget) -> String {
    format!(
        "docker exec {} pg_dump --format=custom --no-acl --no-owner --username {} {} > {}",
        shell_quote(&location.container),
        shell_quote(&database.postgres_user),
        shell_quote(&database.postgres_db),
        shell_quote(&location.location())
    )
}

/// 查询文件字节数
pub fn disk_usage(path: &str) -> String {
    format!("du -b {} | cut -f1", shell_quote(path))
}

/// 删除远程文件
pub fn remove_file(path: &str) -> String {
    format!("rm -f {}", shell_quote(path))
}
