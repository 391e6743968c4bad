use clap::Parser;
use dockyard_cli::{
    Cli, CliApp, Commands, check_config, generate_dockerfile, run_init, setup_logging,
};
use dockyard_core::DockyardError;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录
    setup_logging(cli.verbose);

    // `init` 与 `buildpack` 不需要加载配置
    match &cli.command {
        Commands::Init { force } => {
            if let Err(e) = run_init(&cli.config, *force).await {
                error!("❌ 初始化失败: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Commands::Buildpack {
            file,
            cache,
            output,
        } => {
            if let Err(e) = generate_dockerfile(file, *cache, output.as_deref()) {
                error!("❌ 生成 Dockerfile 失败: {:#}", e);
                std::process::exit(1);
            }
            return;
        }
        _ => {}
    }

    let config = match CliApp::load_config(&cli.config) {
        Ok(config) => config,
        Err(DockyardError::ConfigNotFound) => {
            error!("❌ 配置文件 '{}' 未找到。", cli.config.display());
            error!("👉 请先运行 'dockyard init' 命令来创建配置文件。");
            std::process::exit(1);
        }
        Err(e) => {
            error!("❌ 加载配置失败: {}", e);
            std::process::exit(1);
        }
    };

    if let Commands::CheckConfig = cli.command {
        if let Err(e) = check_config(&config) {
            error!("❌ {}", e);
            std::process::exit(1);
        }
        return;
    }

    let app = match CliApp::new(config, cli.local).await {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 应用初始化失败: {:#}", e);
            std::process::exit(1);
        }
    };

    // 运行命令
    if let Err(e) = app.run_command(cli.command).await {
        error!("❌ 操作失败: {:#}", e);
        std::process::exit(1);
    }
}
