// 远程命令执行模块
//
// 备份引擎把多步 shell 流水线（mkdir + dump、du、上传）作为有序命令列表
// 一次性交给执行器。执行器负责传输、超时与退出码判断。

mod local;
mod process;
mod ssh;

use crate::Result;
use crate::models::Server;
use async_trait::async_trait;

pub use local::LocalExecutor;
pub use ssh::{SshExecutor, SshOptions};

/// 在指定主机上按顺序执行一组 shell 命令
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// 返回合并后的 stdout/stderr；非零退出或连接失败时返回错误
    async fn execute(&self, commands: &[String], server: &Server) -> Result<String>;
}

/// 把命令列表拼成一个遇错即停的脚本
pub fn build_script(commands: &[String]) -> String {
    let mut script = String::from("set -e\n");
    for command in commands {
        script.push_str(command);
        script.push('\n');
    }
    script
}
