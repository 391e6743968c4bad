// 数据库备份模块
//
// - engine: 单次备份的完整流程（路径、转储、大小、保留清理、上传、落盘）
// - retention: 本地保留策略
// - location/commands/upload: 远程路径与 shell 命令的生成
// - output: 执行输出的累积规则

pub mod commands;
mod engine;
pub mod location;
pub mod output;
pub mod retention;
pub mod upload;

pub use engine::{BackupEngine, PruneReport};
pub use location::{BackupLocation, slug};
pub use retention::{RetentionPolicy, select_for_deletion};

#[cfg(test)]
mod tests;
