use thiserror::Error;

pub type Result<T> = std::result::Result<T, DockyardError>;

#[derive(Error, Debug)]
pub enum DockyardError {
    #[error("配置解析错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置序列化错误: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("配置文件未找到")]
    ConfigNotFound,

    #[error("DuckDB数据库错误: {0}")]
    DuckDb(String),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("远程命令执行失败 (exit code {code:?}): {output}")]
    RemoteCommand { code: Option<i32>, output: String },

    #[error("远程连接失败: {0}")]
    Transport(String),

    #[error("远程命令执行超时: {0}秒")]
    Timeout(u64),

    #[error("备份操作失败: {0}")]
    Backup(String),

    #[error("构建包生成失败: {0}")]
    Buildpack(String),

    #[error("自定义错误: {0}")]
    Custom(String),
}

// 为DuckDB错误实现From trait
impl From<duckdb::Error> for DockyardError {
    fn from(err: duckdb::Error) -> Self {
        DockyardError::DuckDb(err.to_string())
    }
}

impl DockyardError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn backup(msg: impl Into<String>) -> Self {
        Self::Backup(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn buildpack(msg: impl Into<String>) -> Self {
        Self::Buildpack(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// 远程命令失败时写入执行记录的文本
    ///
    /// 命令本身的输出比包装后的错误描述更有用，所以这里直接返回输出。
    pub fn output_message(&self) -> String {
        match self {
            DockyardError::RemoteCommand { output, .. } if !output.trim().is_empty() => {
                output.trim().to_string()
            }
            other => other.to_string(),
        }
    }
}
