use super::*;
use crate::db::DuckDbManager;
use crate::executor::RemoteExecutor;
use crate::models::{
    BackupDefinition, BackupExecution, BackupJob, DatabaseEngine, DatabaseTarget,
    ExecutionStatus, RemoteStorageTarget, RunOutcome, Server, Team,
};
use crate::notification::{BackupEvent, NotificationSink};
use crate::store::ExecutionStore;
use crate::{DockyardError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Responder = Box<dyn Fn(&[String]) -> Result<String> + Send + Sync>;

/// 记录所有命令并按脚本返回结果的执行器
struct ScriptedExecutor {
    calls: Mutex<Vec<Vec<String>>>,
    responder: Responder,
}

impl ScriptedExecutor {
    fn new(responder: impl Fn(&[String]) -> Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// 全部成功，du 返回固定大小
    fn healthy() -> Arc<Self> {
        Self::new(|commands| {
            if commands[0].starts_with("du -b") {
                Ok("2048\n".to_string())
            } else {
                Ok(String::new())
            }
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn flat_calls(&self) -> Vec<String> {
        self.calls().into_iter().flatten().collect()
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(&self, commands: &[String], _server: &Server) -> Result<String> {
        self.calls.lock().unwrap().push(commands.to_vec());
        (self.responder)(commands)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<(i64, BackupEvent)>>,
    operator: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<(i64, BackupEvent)> {
        self.events.lock().unwrap().clone()
    }

    fn operator_messages(&self) -> Vec<String> {
        self.operator.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, team: &Team, event: &BackupEvent) {
        self.events.lock().unwrap().push((team.id, event.clone()));
    }

    async fn notify_operator(&self, message: &str) {
        self.operator.lock().unwrap().push(message.to_string());
    }
}

/// 创建记录时就失败的存储
struct BrokenStore;

#[async_trait]
impl ExecutionStore for BrokenStore {
    async fn create(&self, _definition_id: i64, _filename: &str) -> Result<i64> {
        Err(DockyardError::DuckDb("disk full".to_string()))
    }

    async fn update_status(&self, _execution_id: i64, _status: ExecutionStatus) -> Result<()> {
        unreachable!()
    }

    async fn finalize(
        &self,
        _execution_id: i64,
        _status: ExecutionStatus,
        _message: Option<String>,
        _size: u64,
    ) -> Result<()> {
        unreachable!()
    }

    async fn get(&self, _execution_id: i64) -> Result<Option<BackupExecution>> {
        Ok(None)
    }

    async fn list(&self, _definition_id: i64) -> Result<Vec<BackupExecution>> {
        Ok(Vec::new())
    }

    async fn successful(&self, _definition_id: i64, _skip: usize) -> Result<Vec<BackupExecution>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _execution_id: i64) -> Result<()> {
        Ok(())
    }
}

const ROOT: &str = "/data/coolify/backups";

fn job(keep_local_count: u32) -> BackupJob {
    BackupJob {
        definition: BackupDefinition {
            id: 1,
            uuid: "def-1".to_string(),
            team_id: 7,
            database_id: 3,
            server: "main".to_string(),
            keep_local_count,
            frequency: "0 0 * * *".to_string(),
            enabled: true,
            save_remote: false,
            remote_storage: None,
        },
        database: DatabaseTarget {
            id: 3,
            name: "app-db".to_string(),
            uuid: "pg-abc".to_string(),
            status: "running:healthy".to_string(),
            engine: DatabaseEngine::Postgresql,
            postgres_user: "postgres".to_string(),
            postgres_db: "app".to_string(),
            network: "app-net".to_string(),
        },
        team: Team {
            id: 7,
            name: "Acme".to_string(),
        },
        server: Server {
            name: "main".to_string(),
            ip: "10.0.0.5".to_string(),
            user: "root".to_string(),
            port: 22,
        },
    }
}

fn with_upload(mut job: BackupJob) -> BackupJob {
    job.definition.save_remote = true;
    job.definition.remote_storage = Some(RemoteStorageTarget {
        key: "AKIA".to_string(),
        secret: "s3cret".to_string(),
        bucket: "backups".to_string(),
        endpoint: "https://s3.example.com".to_string(),
    });
    job
}

async fn engine(
    executor: Arc<ScriptedExecutor>,
) -> (BackupEngine, Arc<DuckDbManager>, Arc<RecordingNotifier>) {
    let store = Arc::new(DuckDbManager::new_memory().await.unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = BackupEngine::new(executor, store.clone(), notifier.clone(), ROOT);
    (engine, store, notifier)
}

async fn seed_successful(store: &DuckDbManager, definition_id: i64, count: usize) -> Vec<i64> {
    let mut ids = Vec::new();
    for i in 0..count {
        let id = store
            .create(definition_id, &format!("/old/pg_dump-{i}.dump"))
            .await
            .unwrap();
        store
            .update_status(id, ExecutionStatus::Success)
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

fn completed_id(outcome: &RunOutcome) -> i64 {
    match outcome {
        RunOutcome::Completed { execution_id, .. } => *execution_id,
        RunOutcome::Skipped => panic!("run was skipped"),
    }
}

#[tokio::test]
async fn test_not_running_database_is_skipped() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, notifier) = engine(executor.clone()).await;

    let mut job = job(2);
    job.database.status = "exited".to_string();

    let outcome = engine.run(&job).await.unwrap();
    assert_eq!(outcome, RunOutcome::Skipped);
    assert!(store.list(1).await.unwrap().is_empty());
    assert!(notifier.events().is_empty());
    assert!(notifier.operator_messages().is_empty());
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_system_database_ignores_status() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;

    let mut job = job(2);
    job.database.id = 0;
    job.database.name = "coolify-db".to_string();
    job.database.status = "exited".to_string();

    let outcome = engine.run(&job).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();

    assert!(
        execution
            .filename
            .starts_with("/data/coolify/backups/coolify/coolify-db-10-0-0-5/pg_dump-")
    );
    let calls = executor.calls();
    assert_eq!(calls[0][0], "mkdir -p /data/coolify/backups/coolify/coolify-db-10-0-0-5");
    assert!(calls[0][1].starts_with("docker exec coolify-db pg_dump"));
}

#[tokio::test]
async fn test_successful_run() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, notifier) = engine(executor.clone()).await;
    let job = job(2);

    let outcome = engine.run(&job).await.unwrap();
    let execution_id = completed_id(&outcome);
    assert_eq!(
        outcome,
        RunOutcome::Completed {
            execution_id,
            status: ExecutionStatus::Success,
            size: 2048,
        }
    );

    let execution = store.get(execution_id).await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.size, 2048);
    // 空输出视为无输出
    assert_eq!(execution.message, None);
    assert!(
        execution
            .filename
            .starts_with("/data/coolify/backups/databases/acme-7/pg-abc/pg_dump-")
    );
    assert!(execution.filename.ends_with(".dump"));

    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0][0], "mkdir -p /data/coolify/backups/databases/acme-7/pg-abc");
    assert_eq!(
        calls[0][1],
        format!(
            "docker exec pg-abc pg_dump --format=custom --no-acl --no-owner --username postgres app > {}",
            execution.filename
        )
    );
    assert_eq!(calls[1], vec![format!("du -b {} | cut -f1", execution.filename)]);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, 7);
    assert_eq!(events[0].1, BackupEvent::success(&job));
}

#[tokio::test]
async fn test_failed_dump_records_error() {
    let executor = ScriptedExecutor::new(|commands| {
        if commands.iter().any(|c| c.contains("pg_dump")) {
            Err(DockyardError::RemoteCommand {
                code: Some(1),
                output: "pg_dump: error: connection refused\n".to_string(),
            })
        } else {
            Ok(String::new())
        }
    });
    let (engine, store, notifier) = engine(executor.clone()).await;
    let job = with_upload(job(2));

    let outcome = engine.run(&job).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(
        execution.message.as_deref(),
        Some("pg_dump: error: connection refused")
    );
    assert_eq!(execution.size, 0);

    // 转储失败后不再查询大小，也不上传
    let commands = executor.flat_calls();
    assert!(!commands.iter().any(|c| c.starts_with("du -b")));
    assert!(!commands.iter().any(|c| c.contains("mc cp")));

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].1,
        BackupEvent::failed(&job, Some("pg_dump: error: connection refused".to_string()))
    );
    assert!(notifier.operator_messages().is_empty());
}

#[tokio::test]
async fn test_unsupported_engine_fails_run() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;

    let mut job = job(2);
    job.database.engine = DatabaseEngine::Mysql;

    let outcome = engine.run(&job).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.message.unwrap().contains("mysql"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_size_query_failure_is_recorded() {
    let executor = ScriptedExecutor::new(|commands| {
        if commands[0].starts_with("du -b") {
            Ok("du: cannot access\n".to_string())
        } else {
            Ok("dump ok\n".to_string())
        }
    });
    let (engine, store, _notifier) = engine(executor).await;

    let outcome = engine.run(&job(2)).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.size, 0);
    assert_eq!(
        execution.message.as_deref(),
        Some("dump ok\n无法解析备份文件大小: du: cannot access")
    );
}

#[tokio::test]
async fn test_retention_removes_oldest() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;
    let old = seed_successful(&store, 1, 3).await;
    // 其他定义的记录不受影响
    let other = seed_successful(&store, 2, 3).await;

    let outcome = engine.run(&job(2)).await.unwrap();
    let current = completed_id(&outcome);

    let remaining: Vec<i64> = store.list(1).await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![current, old[2]]);
    assert_eq!(store.list(2).await.unwrap().len(), other.len());

    let removals: Vec<String> = executor
        .flat_calls()
        .into_iter()
        .filter(|c| c.starts_with("rm -f"))
        .collect();
    assert_eq!(
        removals,
        vec!["rm -f /old/pg_dump-1.dump", "rm -f /old/pg_dump-0.dump"]
    );
}

#[tokio::test]
async fn test_retention_failure_keeps_record_and_continues() {
    let executor = ScriptedExecutor::new(|commands| {
        if commands[0] == "rm -f /old/pg_dump-1.dump" {
            Err(DockyardError::RemoteCommand {
                code: Some(1),
                output: "rm: permission denied".to_string(),
            })
        } else if commands[0].starts_with("du -b") {
            Ok("10".to_string())
        } else {
            Ok(String::new())
        }
    });
    let (engine, store, _notifier) = engine(executor).await;
    let old = seed_successful(&store, 1, 3).await;

    let outcome = engine.run(&job(1)).await.unwrap();
    let current = completed_id(&outcome);

    let remaining: Vec<i64> = store.list(1).await.unwrap().iter().map(|e| e.id).collect();
    // pg_dump-1 删除失败被保留，pg_dump-2 与 pg_dump-0 已删除
    assert_eq!(remaining, vec![current, old[1]]);

    let execution = store.get(current).await.unwrap().unwrap();
    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(
        execution.message.as_deref(),
        Some("删除旧备份 /old/pg_dump-1.dump 失败: rm: permission denied")
    );
}

#[tokio::test]
async fn test_zero_retention_without_upload_deletes_current() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;
    seed_successful(&store, 1, 2).await;

    let outcome = engine.run(&job(0)).await.unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Completed {
            status: ExecutionStatus::Success,
            ..
        }
    ));
    assert!(store.list(1).await.unwrap().is_empty());
    let removals = executor
        .flat_calls()
        .into_iter()
        .filter(|c| c.starts_with("rm -f"))
        .count();
    assert_eq!(removals, 3);
}

#[tokio::test]
async fn test_zero_retention_uploads_before_deleting_current() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;
    let job = with_upload(job(0));

    let outcome = engine.run(&job).await.unwrap();
    completed_id(&outcome);
    assert!(store.list(1).await.unwrap().is_empty());

    let commands = executor.flat_calls();
    let upload_at = commands
        .iter()
        .position(|c| c.contains("mc cp"))
        .expect("upload command");
    let removal_at = commands
        .iter()
        .position(|c| c.starts_with("rm -f"))
        .expect("removal command");
    assert!(upload_at < removal_at);
}

#[tokio::test]
async fn test_zero_retention_keeps_current_when_upload_fails() {
    let executor = ScriptedExecutor::new(|commands| {
        if commands.iter().any(|c| c.contains("mc cp")) {
            Err(DockyardError::RemoteCommand {
                code: Some(1),
                output: "mc: bucket unreachable".to_string(),
            })
        } else if commands[0].starts_with("du -b") {
            Ok("2048".to_string())
        } else {
            Ok(String::new())
        }
    });
    let (engine, store, _notifier) = engine(executor.clone()).await;
    let job = with_upload(job(0));

    let outcome = engine.run(&job).await.unwrap();
    let id = completed_id(&outcome);

    let remaining = store.list(1).await.unwrap();
    assert_eq!(remaining.len(), 1);
    let execution = &remaining[0];
    assert_eq!(execution.id, id);
    assert_eq!(execution.status, ExecutionStatus::Success);

    let message = execution.message.as_deref().unwrap_or_default();
    assert!(message.contains("mc: bucket unreachable"));
    assert!(message.contains("上传失败，保留本地备份"));
    assert!(message.contains(&execution.filename));

    assert!(
        !executor
            .flat_calls()
            .iter()
            .any(|c| c.starts_with("rm -f") && c.contains(&execution.filename))
    );
}

#[tokio::test]
async fn test_upload_success_appends_message() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;
    let job = with_upload(job(3));

    let outcome = engine.run(&job).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();
    assert_eq!(execution.message.as_deref(), Some("已上传到对象存储。"));

    let calls = executor.calls();
    let last = calls.last().unwrap();
    assert_eq!(last, &vec!["docker rm -f backup-of-def-1".to_string()]);
}

#[tokio::test]
async fn test_upload_failure_does_not_fail_run() {
    let executor = ScriptedExecutor::new(|commands| {
        if commands.iter().any(|c| c.contains("mc config host add")) {
            Err(DockyardError::RemoteCommand {
                code: Some(1),
                output: "mc: invalid credentials".to_string(),
            })
        } else if commands[0].starts_with("docker rm -f") {
            Err(DockyardError::transport("connection reset"))
        } else if commands[0].starts_with("du -b") {
            Ok("512".to_string())
        } else {
            Ok("dumped".to_string())
        }
    });
    let (engine, store, notifier) = engine(executor.clone()).await;
    let job = with_upload(job(3));

    let outcome = engine.run(&job).await.unwrap();
    let execution = store.get(completed_id(&outcome)).await.unwrap().unwrap();

    assert_eq!(execution.status, ExecutionStatus::Success);
    assert_eq!(execution.size, 512);
    assert_eq!(
        execution.message.as_deref(),
        Some("dumped\nmc: invalid credentials")
    );
    assert!(
        executor
            .flat_calls()
            .contains(&"docker rm -f backup-of-def-1".to_string())
    );
    assert!(notifier.operator_messages().is_empty());
}

#[tokio::test]
async fn test_fatal_failure_alerts_operator() {
    let executor = ScriptedExecutor::healthy();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = BackupEngine::new(executor.clone(), Arc::new(BrokenStore), notifier.clone(), ROOT);

    let result = engine.run(&job(2)).await;
    assert!(matches!(result, Err(DockyardError::DuckDb(_))));

    let messages = notifier.operator_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("disk full"));
    assert!(notifier.events().is_empty());
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_prune_outside_run() {
    let executor = ScriptedExecutor::healthy();
    let (engine, store, _notifier) = engine(executor.clone()).await;
    let ids = seed_successful(&store, 1, 5).await;

    let report = engine.prune(&job(2)).await.unwrap();
    assert_eq!(report.deleted, vec![ids[2], ids[1], ids[0]]);
    assert!(report.failures.is_empty());

    let remaining: Vec<i64> = store.list(1).await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![ids[4], ids[3]]);
}
