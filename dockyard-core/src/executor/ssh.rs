use super::RemoteExecutor;
use super::build_script;
use super::process::run_script;
use crate::constants::ssh;
use crate::models::Server;
use crate::{DockyardError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// ssh 客户端在连接失败时使用的退出码
const SSH_CONNECTION_ERROR_CODE: i32 = 255;

/// SSH 连接选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshOptions {
    /// 私钥路径，不设置时使用 ssh 默认配置
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// 是否校验主机指纹
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

fn default_connect_timeout() -> u64 {
    ssh::DEFAULT_CONNECT_TIMEOUT
}

fn default_command_timeout() -> u64 {
    ssh::DEFAULT_COMMAND_TIMEOUT
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            identity_file: None,
            connect_timeout_secs: ssh::DEFAULT_CONNECT_TIMEOUT,
            command_timeout_secs: ssh::DEFAULT_COMMAND_TIMEOUT,
            strict_host_key_checking: false,
        }
    }
}

/// 通过系统 ssh 客户端在远程主机上执行命令
#[derive(Debug, Clone, Default)]
pub struct SshExecutor {
    options: SshOptions,
}

impl SshExecutor {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// 生成 ssh 参数（不含程序名）
    pub(crate) fn ssh_args(&self, server: &Server) -> Vec<String> {
        let strict = if self.options.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };

        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout_secs),
            "-o".to_string(),
            format!("StrictHostKeyChecking={strict}"),
            "-p".to_string(),
            server.port.to_string(),
        ];

        if let Some(identity) = &self.options.identity_file {
            args.push("-i".to_string());
            args.push(identity.to_string_lossy().to_string());
        }

        args.push(format!("{}@{}", server.user, server.ip));
        args.push("sh -se".to_string());
        args
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, commands: &[String], server: &Server) -> Result<String> {
        if which::which("ssh").is_err() {
            return Err(DockyardError::transport("ssh 未安装或不在 PATH 中"));
        }

        debug!(
            server = %server.name,
            ip = %server.ip,
            count = commands.len(),
            "通过 ssh 执行远程命令"
        );

        let mut command = Command::new("ssh");
        command.args(self.ssh_args(server));

        let (code, output) = run_script(
            command,
            &build_script(commands),
            self.options.command_timeout_secs,
        )
        .await?;

        match code {
            Some(0) => Ok(output),
            Some(SSH_CONNECTION_ERROR_CODE) => Err(DockyardError::transport(format!(
                "无法连接 {}@{}:{}: {}",
                server.user,
                server.ip,
                server.port,
                output.trim()
            ))),
            code => Err(DockyardError::RemoteCommand { code, output }),
        }
    }
}
