use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dockyard CLI - 数据库定时备份与构建包生成工具
#[derive(Parser, Debug)]
#[command(name = "dockyard")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    /// 在本机执行命令而不是通过 ssh 连接目标主机
    #[arg(long, global = true)]
    pub local: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 创建默认配置文件
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 立即执行一次指定备份定义
    Run {
        /// 备份定义 ID
        definition_id: i64,
    },
    /// 执行所有启用的备份定义
    RunAll,
    /// 列出备份定义的执行记录
    List {
        /// 备份定义 ID
        definition_id: i64,
    },
    /// 在备份之外单独执行本地保留策略
    Prune {
        /// 备份定义 ID
        definition_id: i64,
    },
    /// 根据构建配置生成 Dockerfile
    Buildpack {
        /// 构建配置文件（TOML）
        file: PathBuf,
        /// 生成 static 模式所需的缓存镜像 Dockerfile
        #[arg(long)]
        cache: bool,
        /// 输出文件，不指定时打印到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 检查配置文件
    CheckConfig,
}
