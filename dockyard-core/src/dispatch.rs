use crate::Result;
use crate::backup::BackupEngine;
use crate::lock::LeaseLock;
use crate::models::{BackupJob, RunOutcome};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// 一次派发的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ran(RunOutcome),
    /// 同一个备份定义已有运行中的任务
    AlreadyRunning,
}

/// 在租约保护下调用备份引擎
#[derive(Clone)]
pub struct Dispatcher {
    engine: BackupEngine,
    locks: LeaseLock,
}

impl Dispatcher {
    pub fn new(engine: BackupEngine, locks: LeaseLock) -> Self {
        Self { engine, locks }
    }

    pub fn engine(&self) -> &BackupEngine {
        &self.engine
    }

    pub fn locks(&self) -> &LeaseLock {
        &self.locks
    }

    /// 获取租约后运行备份，运行期间每隔 TTL/3 续约一次
    pub async fn dispatch(&self, job: &BackupJob) -> Result<DispatchOutcome> {
        let definition_id = job.definition.id;
        let Some(guard) = self.locks.try_acquire(definition_id) else {
            info!(definition_id, "备份任务正在运行，跳过本次派发");
            return Ok(DispatchOutcome::AlreadyRunning);
        };

        let period = (self.locks.ttl() / 3).max(Duration::from_millis(1));
        let mut heartbeat = tokio::time::interval(period);
        // 第一次 tick 立即返回
        heartbeat.tick().await;

        let run = self.engine.run(job);
        tokio::pin!(run);
        let outcome = loop {
            tokio::select! {
                result = &mut run => break result?,
                _ = heartbeat.tick() => {
                    if guard.renew() {
                        debug!(definition_id, "租约已续期");
                    } else {
                        warn!(definition_id, "租约已被接管，无法续期");
                    }
                }
            }
        };
        Ok(DispatchOutcome::Ran(outcome))
    }

    /// 并发派发多个任务，按完成顺序返回 (definition_id, 结果)
    pub async fn dispatch_all(
        &self,
        jobs: Vec<BackupJob>,
    ) -> Vec<(i64, Result<DispatchOutcome>)> {
        let mut tasks = JoinSet::new();
        for job in jobs {
            let dispatcher = self.clone();
            tasks.spawn(async move {
                let result = dispatcher.dispatch(&job).await;
                (job.definition.id, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "备份任务异常退出"),
            }
        }
        results
    }
}
