use crate::Result;
use crate::models::{BackupDefinition, BackupExecution};
use crate::store::ExecutionStore;

/// 本地保留策略
///
/// 成功记录按创建时间从新到旧排列：保留数为 0 时全部可删；
/// 否则跳过最新的 `keep_local_count` 条，其余可删。
/// 两种情况都等价于以保留数为偏移量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    keep_local_count: u32,
}

impl RetentionPolicy {
    pub fn new(keep_local_count: u32) -> Self {
        Self { keep_local_count }
    }

    pub fn for_definition(definition: &BackupDefinition) -> Self {
        Self::new(definition.keep_local_count)
    }

    /// 从最新记录开始需要跳过的条数
    pub fn offset(&self) -> usize {
        self.keep_local_count as usize
    }

    /// 对已按新到旧排好序的成功记录应用策略
    pub fn apply<T: Clone>(&self, successful_newest_first: &[T]) -> Vec<T> {
        successful_newest_first
            .iter()
            .skip(self.offset())
            .cloned()
            .collect()
    }
}

/// 选出该备份定义下可删除的执行记录
pub async fn select_for_deletion(
    store: &dyn ExecutionStore,
    definition: &BackupDefinition,
) -> Result<Vec<BackupExecution>> {
    let policy = RetentionPolicy::for_definition(definition);
    store.successful(definition.id, policy.offset()).await
}
