use crate::{DockyardError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// 通过 stdin 把脚本交给子进程执行，返回合并输出
pub(crate) async fn run_script(
    mut command: Command,
    script: &str,
    timeout_secs: u64,
) -> Result<(Option<i32>, String)> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(script.as_bytes()).await?;
        // 关闭 stdin，让 shell 读到 EOF
        drop(stdin);
    }

    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await
    .map_err(|_| DockyardError::Timeout(timeout_secs))??;

    let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }

    debug!(code = ?output.status.code(), "脚本执行结束");
    Ok((output.status.code(), combined))
}
