use crate::constants::http;
use crate::models::{BackupJob, Team};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 发给团队的备份事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackupEvent {
    BackupSuccess {
        definition_id: i64,
        frequency: String,
        database_id: i64,
        database_name: String,
    },
    BackupFailed {
        definition_id: i64,
        frequency: String,
        database_id: i64,
        database_name: String,
        output: Option<String>,
    },
}

impl BackupEvent {
    pub fn success(job: &BackupJob) -> Self {
        BackupEvent::BackupSuccess {
            definition_id: job.definition.id,
            frequency: job.definition.frequency.clone(),
            database_id: job.database.id,
            database_name: job.database.name.clone(),
        }
    }

    pub fn failed(job: &BackupJob, output: Option<String>) -> Self {
        BackupEvent::BackupFailed {
            definition_id: job.definition.id,
            frequency: job.definition.frequency.clone(),
            database_id: job.database.id,
            database_name: job.database.name.clone(),
            output,
        }
    }

    /// 通知标题
    pub fn title(&self) -> String {
        match self {
            BackupEvent::BackupSuccess { database_name, .. } => {
                format!("数据库 {database_name} 备份成功")
            }
            BackupEvent::BackupFailed { database_name, .. } => {
                format!("数据库 {database_name} 备份失败")
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, BackupEvent::BackupFailed { .. })
    }
}

/// 通知发送接口，发送失败只记录日志，不向调用方传播
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 通知团队
    async fn notify(&self, team: &Team, event: &BackupEvent);

    /// 通知平台运维人员
    async fn notify_operator(&self, message: &str);
}

/// 只写日志的通知
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, team: &Team, event: &BackupEvent) {
        if event.is_failure() {
            warn!(team_id = team.id, team = %team.name, "{}", event.title());
        } else {
            info!(team_id = team.id, team = %team.name, "{}", event.title());
        }
    }

    async fn notify_operator(&self, message: &str) {
        error!(operator = true, "{}", message);
    }
}

#[derive(Debug, Serialize)]
struct TeamPayload<'a> {
    team_id: i64,
    team_name: &'a str,
    title: String,
    event: &'a BackupEvent,
}

#[derive(Debug, Serialize)]
struct OperatorPayload<'a> {
    title: &'static str,
    message: &'a str,
}

/// 通过 Webhook 发送 JSON 通知
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    team_url: Option<String>,
    operator_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(team_url: Option<String>, operator_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http::DEFAULT_TIMEOUT))
            .user_agent(http::USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            team_url,
            operator_url,
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, payload: &T) {
        match self.client.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(url, status = %response.status(), "Webhook 通知返回非成功状态");
            }
            Err(e) => {
                warn!(url, error = %e, "Webhook 通知发送失败");
            }
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, team: &Team, event: &BackupEvent) {
        let Some(url) = &self.team_url else {
            return;
        };

        let payload = TeamPayload {
            team_id: team.id,
            team_name: &team.name,
            title: event.title(),
            event,
        };
        self.post(url, &payload).await;
    }

    async fn notify_operator(&self, message: &str) {
        let Some(url) = &self.operator_url else {
            return;
        };

        let payload = OperatorPayload {
            title: "数据库备份任务异常",
            message,
        };
        self.post(url, &payload).await;
    }
}

/// 把通知依次转发给多个接收者
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutNotifier {
    async fn notify(&self, team: &Team, event: &BackupEvent) {
        for sink in &self.sinks {
            sink.notify(team, event).await;
        }
    }

    async fn notify_operator(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify_operator(message).await;
        }
    }
}
