use super::commands::shell_quote;
use super::location::BackupLocation;
use crate::constants::upload;
use crate::models::{BackupJob, RemoteStorageTarget};

/// 上传辅助容器名
pub fn helper_container(definition_uuid: &str) -> String {
    format!("{}{definition_uuid}", upload::HELPER_CONTAINER_PREFIX)
}

/// 辅助容器加入的网络，平台元数据库固定使用平台网络
fn helper_network(job: &BackupJob) -> &str {
    if job.database.is_platform_database() {
        upload::SYSTEM_NETWORK
    } else {
        &job.database.network
    }
}

/// 上传流程：启动辅助容器、注册对象存储、复制备份文件
///
/// 命令中含有密钥，调用方不得记录命令内容。
pub fn upload_commands(
    job: &BackupJob,
    location: &BackupLocation,
    target: &RemoteStorageTarget,
) -> Vec<String> {
    let container = shell_quote(&helper_container(&job.definition.uuid));
    let path = location.location();
    let destination = format!(
        "{}/{}{}/",
        upload::MC_ALIAS,
        target.bucket,
        location.directory
    );

    vec![
        format!(
            "docker run --pull=always -d --network {} --name {container} --rm -v {} {}",
            shell_quote(helper_network(job)),
            shell_quote(&format!("{path}:{path}:ro")),
            upload::HELPER_IMAGE
        ),
        format!(
            "docker exec {container} mc config host add {} {} {} {}",
            upload::MC_ALIAS,
            shell_quote(&target.endpoint),
            shell_quote(&target.key),
            shell_quote(&target.secret)
        ),
        format!(
            "docker exec {container} mc cp {} {}",
            shell_quote(&path),
            shell_quote(&destination)
        ),
    ]
}

/// 上传结束后无论成功与否都要执行的清理
pub fn cleanup_command(definition_uuid: &str) -> String {
    format!("docker rm -f {}", shell_quote(&helper_container(definition_uuid)))
}
