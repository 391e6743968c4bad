/// 备份相关常量
pub mod backup {
    /// 远程主机上的默认备份根目录
    pub const DEFAULT_BACKUP_ROOT: &str = "/data/coolify/backups";

    /// 普通数据库备份所在的子目录
    pub const DATABASES_DIR_NAME: &str = "databases";

    /// 平台自身元数据库备份所在的子目录
    pub const SYSTEM_DIR_NAME: &str = "coolify";

    /// 平台自身元数据库的名称（同时也是其容器名）
    pub const SYSTEM_DATABASE_NAME: &str = "coolify-db";

    /// 哨兵系统数据库 ID，不做运行状态检查
    pub const SYSTEM_DATABASE_ID: i64 = 0;

    /// 数据库运行状态前缀（例如 "running:healthy"）
    pub const RUNNING_STATUS_PREFIX: &str = "running";

    /// 转储文件名前缀
    pub const DUMP_FILE_PREFIX: &str = "pg_dump-";

    /// 转储文件扩展名
    pub const DUMP_FILE_EXTENSION: &str = ".dump";

    /// 上传成功后追加到执行输出的消息
    pub const UPLOAD_SUCCESS_MESSAGE: &str = "已上传到对象存储。";

    /// 保留数为 0 且上传失败时，本次备份文件不会被删除
    pub const UPLOAD_FAILED_KEEP_MESSAGE: &str = "上传失败，保留本地备份";
}

/// 对象存储上传相关常量
pub mod upload {
    /// 上传辅助镜像（内置 mc 客户端）
    pub const HELPER_IMAGE: &str = "ghcr.io/coollabsio/coolify-helper";

    /// 辅助容器名前缀
    pub const HELPER_CONTAINER_PREFIX: &str = "backup-of-";

    /// mc 中注册的临时别名
    pub const MC_ALIAS: &str = "temporary";

    /// 平台元数据库所在的容器网络
    pub const SYSTEM_NETWORK: &str = "coolify";
}

/// HTTP相关常量
pub mod http {
    /// 默认请求超时（秒）
    pub const DEFAULT_TIMEOUT: u64 = 30;

    /// User-Agent
    pub const USER_AGENT: &str = "dockyard/0.1";
}

/// SSH 相关常量
pub mod ssh {
    /// 默认登录用户
    pub const DEFAULT_USER: &str = "root";

    /// 默认端口
    pub const DEFAULT_PORT: u16 = 22;

    /// 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

    /// 默认单次命令执行超时（秒）
    pub const DEFAULT_COMMAND_TIMEOUT: u64 = 3600;
}

/// 锁相关常量
pub mod lock {
    /// 备份租约默认有效期（秒），worker 崩溃后租约过期即可被接管
    pub const DEFAULT_LEASE_SECS: u64 = 3600;
}

/// Cron表达式相关常量
pub mod cron {
    /// 默认备份频率：每天凌晨0点
    pub const DEFAULT_BACKUP_CRON: &str = "0 0 * * *";

    /// Cron表达式字段数量（分 时 日 月 周）
    pub const CRON_FIELDS_COUNT: usize = 5;
}

/// 配置文件相关常量
pub mod config {
    use std::path::PathBuf;

    /// 配置文件名（按优先级查找）
    pub const CONFIG_FILE_NAMES: [&str; 3] = ["config.toml", "dockyard.toml", ".dockyard.toml"];

    /// 默认数据库文件名
    pub const DATABASE_FILE_NAME: &str = "dockyard.db";

    /// 默认数据目录
    pub const DATA_DIR_NAME: &str = "data";

    /// 获取默认数据库文件路径
    pub fn get_database_path() -> PathBuf {
        PathBuf::from(".")
            .join(DATA_DIR_NAME)
            .join(DATABASE_FILE_NAME)
    }
}

/// 构建包相关常量
pub mod buildpack {
    /// 应用在镜像中的工作目录
    pub const APP_DIR: &str = "/app";

    /// 静态站点在 nginx 镜像中的根目录
    pub const STATIC_ROOT: &str = "/usr/share/nginx/html";

    /// 静态站点对外端口
    pub const STATIC_PORT: u16 = 80;

    /// 缓存镜像标签后缀
    pub const CACHE_TAG_SUFFIX: &str = "-cache";

    /// 标识应用的镜像标签键
    pub const APPLICATION_LABEL: &str = "coolify.applicationId";

    /// 默认 Node 基础镜像
    pub const DEFAULT_NODE_IMAGE: &str = "node:lts";

    /// 默认静态站点基础镜像
    pub const DEFAULT_STATIC_IMAGE: &str = "nginx:stable-alpine";
}

/// 日志相关常量
pub mod logging {
    /// 默认日志级别
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// 设置后日志输出到该文件
    pub const LOG_FILE_ENV: &str = "DOCKYARD_LOG_FILE";
}
