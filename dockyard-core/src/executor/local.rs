use super::RemoteExecutor;
use super::build_script;
use super::process::run_script;
use crate::constants::ssh;
use crate::models::Server;
use crate::{DockyardError, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// 在本机执行命令，忽略目标主机（单机部署与测试使用）
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    command_timeout: u64,
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self {
            command_timeout: ssh::DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl LocalExecutor {
    pub fn new(command_timeout: u64) -> Self {
        Self { command_timeout }
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn execute(&self, commands: &[String], server: &Server) -> Result<String> {
        if which::which("sh").is_err() {
            return Err(DockyardError::transport("sh 未安装或不在 PATH 中"));
        }

        debug!(server = %server.name, count = commands.len(), "在本机执行命令");
        let mut command = Command::new("sh");
        command.arg("-s");

        let (code, output) =
            run_script(command, &build_script(commands), self.command_timeout).await?;
        match code {
            Some(0) => Ok(output),
            code => Err(DockyardError::RemoteCommand { code, output }),
        }
    }
}
