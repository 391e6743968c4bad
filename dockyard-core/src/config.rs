use crate::constants::{backup, config};
use crate::error::{DockyardError, Result};
use crate::executor::SshOptions;
use crate::models::{BackupDefinition, BackupJob, DatabaseTarget, Server, Team};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backup: BackupSettings,
    #[serde(default)]
    pub ssh: SshOptions,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub databases: Vec<DatabaseTarget>,
    #[serde(default)]
    pub definitions: Vec<BackupDefinition>,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupSettings {
    /// 远程主机上的备份根目录
    #[serde(default = "default_root_dir")]
    pub root_dir: String,
    /// 本地执行记录数据库
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

fn default_root_dir() -> String {
    backup::DEFAULT_BACKUP_ROOT.to_string()
}

fn default_database_file() -> String {
    config::get_database_path().to_string_lossy().to_string()
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            database_file: default_database_file(),
        }
    }
}

/// 通知相关配置
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NotificationSettings {
    /// 团队通知 Webhook
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// 运维告警 Webhook
    #[serde(default)]
    pub operator_webhook_url: Option<String>,
}

impl NotificationSettings {
    pub fn has_webhook(&self) -> bool {
        self.webhook_url.is_some() || self.operator_webhook_url.is_some()
    }
}

#[derive(Serialize)]
struct Inventory<'a> {
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    teams: &'a [Team],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    servers: &'a [Server],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    databases: &'a [DatabaseTarget],
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    definitions: &'a [BackupDefinition],
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：config.toml -> dockyard.toml -> .dockyard.toml
    pub fn find_and_load_config() -> Result<Self> {
        for config_file in &config::CONFIG_FILE_NAMES {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        tracing::warn!("未找到配置文件");
        Err(DockyardError::ConfigNotFound)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments()?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> Result<String> {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        let inventory = toml::to_string(&Inventory {
            teams: &self.teams,
            servers: &self.servers,
            databases: &self.databases,
            definitions: &self.definitions,
        })?;

        let identity_file = match &self.ssh.identity_file {
            Some(path) => format!("identity_file = {:?}", path.to_string_lossy()),
            None => "# identity_file = \"/root/.ssh/id_ed25519\"".to_string(),
        };

        Ok(TEMPLATE
            .replace("{backup_root_dir}", &self.backup.root_dir)
            .replace("{backup_database_file}", &self.backup.database_file)
            .replace("{ssh_identity_file}", &identity_file)
            .replace(
                "{ssh_connect_timeout}",
                &self.ssh.connect_timeout_secs.to_string(),
            )
            .replace(
                "{ssh_command_timeout}",
                &self.ssh.command_timeout_secs.to_string(),
            )
            .replace(
                "{ssh_strict_host_key_checking}",
                &self.ssh.strict_host_key_checking.to_string(),
            )
            .replace(
                "{webhook_url}",
                &optional_line("webhook_url", &self.notifications.webhook_url),
            )
            .replace(
                "{operator_webhook_url}",
                &optional_line(
                    "operator_webhook_url",
                    &self.notifications.operator_webhook_url,
                ),
            )
            .replace("{inventory}", inventory.trim_end()))
    }

    /// 确保执行记录数据库所在目录存在
    pub fn ensure_data_dir(&self) -> Result<()> {
        if let Some(parent) = self.database_path().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.backup.database_file)
    }

    /// 检查配置中的引用关系与备份定义，返回全部问题
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let team_ids = collect_unique(self.teams.iter().map(|t| t.id), "团队", &mut problems);
        let server_names = collect_unique(
            self.servers.iter().map(|s| s.name.clone()),
            "主机",
            &mut problems,
        );
        let database_ids = collect_unique(
            self.databases.iter().map(|d| d.id),
            "数据库",
            &mut problems,
        );
        collect_unique(
            self.definitions.iter().map(|d| d.id),
            "备份定义",
            &mut problems,
        );

        for definition in &self.definitions {
            let id = definition.id;
            if !team_ids.contains(&definition.team_id) {
                problems.push(format!(
                    "备份定义 {id} 引用的团队 {} 不存在",
                    definition.team_id
                ));
            }
            if !database_ids.contains(&definition.database_id) {
                problems.push(format!(
                    "备份定义 {id} 引用的数据库 {} 不存在",
                    definition.database_id
                ));
            }
            if !server_names.contains(&definition.server) {
                problems.push(format!(
                    "备份定义 {id} 引用的主机 {} 不存在",
                    definition.server
                ));
            }
            if definition.uuid.trim().is_empty() {
                problems.push(format!("备份定义 {id} 缺少 uuid"));
            }
            if !definition.has_valid_frequency() {
                problems.push(format!(
                    "备份定义 {id} 的 cron 表达式无效: {}",
                    definition.frequency
                ));
            }
            if definition.save_remote {
                match &definition.remote_storage {
                    None => problems.push(format!("备份定义 {id} 启用了远程存储但未配置")),
                    Some(target) => {
                        let missing = target.missing_fields();
                        if !missing.is_empty() {
                            problems.push(format!(
                                "备份定义 {id} 的远程存储缺少字段: {}",
                                missing.join(", ")
                            ));
                        }
                    }
                }
            }
        }

        problems
    }

    /// 校验配置，有问题时返回全部问题
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DockyardError::invalid_config(problems.join("; ")))
        }
    }

    pub fn definition(&self, definition_id: i64) -> Option<&BackupDefinition> {
        self.definitions.iter().find(|d| d.id == definition_id)
    }

    /// 把备份定义解析为引擎可直接使用的任务
    pub fn resolve_job(&self, definition_id: i64) -> Result<BackupJob> {
        let definition = self.definition(definition_id).ok_or_else(|| {
            DockyardError::invalid_config(format!("备份定义 {definition_id} 不存在"))
        })?;

        let team = self
            .teams
            .iter()
            .find(|t| t.id == definition.team_id)
            .ok_or_else(|| {
                DockyardError::invalid_config(format!(
                    "备份定义 {definition_id} 引用的团队 {} 不存在",
                    definition.team_id
                ))
            })?;
        let database = self
            .databases
            .iter()
            .find(|d| d.id == definition.database_id)
            .ok_or_else(|| {
                DockyardError::invalid_config(format!(
                    "备份定义 {definition_id} 引用的数据库 {} 不存在",
                    definition.database_id
                ))
            })?;
        let server = self
            .servers
            .iter()
            .find(|s| s.name == definition.server)
            .ok_or_else(|| {
                DockyardError::invalid_config(format!(
                    "备份定义 {definition_id} 引用的主机 {} 不存在",
                    definition.server
                ))
            })?;

        Ok(BackupJob {
            definition: definition.clone(),
            database: database.clone(),
            team: team.clone(),
            server: server.clone(),
        })
    }

    /// 所有启用的备份任务
    pub fn enabled_jobs(&self) -> Result<Vec<BackupJob>> {
        self.definitions
            .iter()
            .filter(|d| d.enabled)
            .map(|d| self.resolve_job(d.id))
            .collect()
    }
}

fn optional_line(key: &str, value: &Option<String>) -> String {
    match value {
        Some(value) => format!("{key} = {value:?}"),
        None => format!("# {key} = \"\""),
    }
}

fn collect_unique<T, I>(values: I, kind: &str, problems: &mut Vec<String>) -> HashSet<T>
where
    T: std::hash::Hash + Eq + std::fmt::Display,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    for value in values {
        if seen.contains(&value) {
            problems.push(format!("{kind} {value} 重复"));
        } else {
            seen.insert(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatabaseEngine, RemoteStorageTarget};

    const SAMPLE: &str = r#"
[backup]
root_dir = "/srv/backups"
database_file = "state/dockyard.db"

[ssh]
identity_file = "/root/.ssh/id_ed25519"
command_timeout_secs = 600

[notifications]
webhook_url = "https://hooks.example.com/team"

[[teams]]
id = 7
name = "Acme"

[[servers]]
name = "main"
ip = "10.0.0.5"

[[databases]]
id = 3
name = "app-db"
uuid = "pg-abc"
status = "running:healthy"
postgres_db = "app"

[[definitions]]
id = 1
uuid = "def-1"
team_id = 7
database_id = 3
server = "main"
keep_local_count = 2
frequency = "0 3 * * *"
save_remote = true

[definitions.remote_storage]
key = "AKIA"
secret = "s3cret"
bucket = "backups"
endpoint = "https://s3.example.com"

[[definitions]]
id = 2
uuid = "def-2"
team_id = 7
database_id = 3
server = "main"
enabled = false
"#;

    fn sample() -> AppConfig {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let config = sample();

        assert_eq!(config.backup.root_dir, "/srv/backups");
        assert_eq!(config.ssh.command_timeout_secs, 600);
        assert_eq!(config.ssh.connect_timeout_secs, 10);
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("https://hooks.example.com/team")
        );
        assert!(config.notifications.operator_webhook_url.is_none());

        let server = &config.servers[0];
        assert_eq!(server.user, "root");
        assert_eq!(server.port, 22);

        let database = &config.databases[0];
        assert_eq!(database.engine, DatabaseEngine::Postgresql);
        assert_eq!(database.postgres_user, "postgres");
        assert_eq!(database.network, "coolify");

        let second = config.definition(2).unwrap();
        assert_eq!(second.keep_local_count, 0);
        assert_eq!(second.frequency, "0 0 * * *");
        assert!(!second.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.backup.root_dir, "/data/coolify/backups");
        assert!(config.database_path().ends_with("dockyard.db"));
        assert!(config.definitions.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_job() {
        let config = sample();

        let job = config.resolve_job(1).unwrap();
        assert_eq!(job.team.name, "Acme");
        assert_eq!(job.server.ip, "10.0.0.5");
        assert_eq!(job.database.uuid, "pg-abc");
        assert_eq!(job.definition.upload_target().unwrap().bucket, "backups");

        assert!(matches!(
            config.resolve_job(99),
            Err(DockyardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_enabled_jobs_skip_disabled() {
        let jobs = sample().enabled_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].definition.id, 1);
    }

    #[test]
    fn test_problems_report_every_issue() {
        let mut config = sample();
        config.definitions[0].frequency = "@daily".to_string();
        config.definitions[0].remote_storage = Some(RemoteStorageTarget {
            key: String::new(),
            secret: "s".to_string(),
            bucket: String::new(),
            endpoint: "https://s3.example.com".to_string(),
        });
        config.definitions[1].server = "missing".to_string();
        config.teams.push(config.teams[0].clone());

        let problems = config.problems();
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("cron")));
        assert!(problems.iter().any(|p| p.contains("key, bucket")));
        assert!(problems.iter().any(|p| p.contains("missing")));
        assert!(problems.iter().any(|p| p.contains("团队 7 重复")));
        assert!(config.validate().is_err());
        assert!(config.resolve_job(2).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = sample();
        config.save_to_file(&path).unwrap();
        let reloaded = AppConfig::load_from_file(&path).unwrap();

        assert_eq!(reloaded.backup.root_dir, config.backup.root_dir);
        assert_eq!(reloaded.ssh.identity_file, config.ssh.identity_file);
        assert_eq!(reloaded.notifications.webhook_url, config.notifications.webhook_url);
        assert_eq!(reloaded.teams, config.teams);
        assert_eq!(reloaded.servers, config.servers);
        assert_eq!(reloaded.databases, config.databases);
        assert_eq!(reloaded.definitions, config.definitions);
    }

    #[test]
    fn test_save_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        AppConfig::default().save_to_file(&path).unwrap();
        let reloaded = AppConfig::load_from_file(&path).unwrap();

        assert!(reloaded.teams.is_empty());
        assert!(reloaded.ssh.identity_file.is_none());
        assert!(reloaded.notifications.webhook_url.is_none());
    }
}
